//! Alert escalation policy.
//!
//! Pure, query-only: nothing in this crate schedules periodic evaluation.
//! The API exposes the predicate over unacknowledged critical events so an
//! external scheduler (or a human refreshing the dashboard) can act on it.

use chrono::Duration;

use crate::event::{EquipmentEvent, EventType};
use crate::types::Timestamp;

/// How long a critical event may sit unacknowledged before it escalates.
pub const ACKNOWLEDGMENT_WINDOW_MINUTES: i64 = 30;

/// Battery percentage at or below which a battery-low event escalates
/// immediately, regardless of acknowledgment.
pub const BATTERY_ESCALATION_THRESHOLD: i64 = 10;

/// Decide whether an event needs renewed attention.
///
/// - Non-critical events never escalate.
/// - An unacknowledged critical event escalates once it has sat for more
///   than [`ACKNOWLEDGMENT_WINDOW_MINUTES`] past `received_at`.
/// - A battery-low event with `batteryLevel` at or below
///   [`BATTERY_ESCALATION_THRESHOLD`] escalates immediately.
pub fn should_escalate(event: &EquipmentEvent, now: Timestamp) -> bool {
    if !event.severity.is_critical() {
        return false;
    }

    if !event.acknowledged
        && event.received_at + Duration::minutes(ACKNOWLEDGMENT_WINDOW_MINUTES) < now
    {
        return true;
    }

    if event.event_type == EventType::BatteryLow {
        return event
            .payload_int("batteryLevel")
            .is_some_and(|level| level <= BATTERY_ESCALATION_THRESHOLD);
    }

    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
