//! Equipment event model and severity classification.
//!
//! [`EquipmentEvent`] is the central entity of the supervision core: a
//! persisted record of something that happened to a piece of field
//! equipment. Severity is derived from the event type via
//! [`EventSeverity::for_event_type`] at ingestion and never changes
//! afterwards.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, EventId, Timestamp};

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// The closed set of event kinds emitted by equipment services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    EquipmentCreated,
    StatusChanged,
    MaintenanceScheduled,
    MaintenanceCompleted,
    BatteryLow,
    SensorOffline,
    EquipmentFailure,
    SystemAlert,
}

impl EventType {
    /// All event types, in declaration order.
    pub const ALL: [EventType; 8] = [
        EventType::EquipmentCreated,
        EventType::StatusChanged,
        EventType::MaintenanceScheduled,
        EventType::MaintenanceCompleted,
        EventType::BatteryLow,
        EventType::SensorOffline,
        EventType::EquipmentFailure,
        EventType::SystemAlert,
    ];

    /// The wire / storage representation (matches the serde rename).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::EquipmentCreated => "EQUIPMENT_CREATED",
            EventType::StatusChanged => "STATUS_CHANGED",
            EventType::MaintenanceScheduled => "MAINTENANCE_SCHEDULED",
            EventType::MaintenanceCompleted => "MAINTENANCE_COMPLETED",
            EventType::BatteryLow => "BATTERY_LOW",
            EventType::SensorOffline => "SENSOR_OFFLINE",
            EventType::EquipmentFailure => "EQUIPMENT_FAILURE",
            EventType::SystemAlert => "SYSTEM_ALERT",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

// ---------------------------------------------------------------------------
// EventSeverity
// ---------------------------------------------------------------------------

/// Urgency level of an event, derived deterministically from its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

impl EventSeverity {
    /// All severity levels, least to most urgent.
    pub const ALL: [EventSeverity; 3] = [
        EventSeverity::Info,
        EventSeverity::Warning,
        EventSeverity::Critical,
    ];

    /// Classify an event type into its severity.
    ///
    /// Total and deterministic; this is the only place severity is ever
    /// assigned.
    pub fn for_event_type(event_type: EventType) -> EventSeverity {
        match event_type {
            EventType::BatteryLow | EventType::SensorOffline | EventType::EquipmentFailure => {
                EventSeverity::Critical
            }
            EventType::StatusChanged | EventType::MaintenanceScheduled => EventSeverity::Warning,
            EventType::EquipmentCreated
            | EventType::MaintenanceCompleted
            | EventType::SystemAlert => EventSeverity::Info,
        }
    }

    /// Whether this severity requires the alert engine's attention.
    pub fn requires_attention(&self) -> bool {
        matches!(self, EventSeverity::Warning | EventSeverity::Critical)
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, EventSeverity::Critical)
    }

    /// The wire / storage representation (matches the serde rename).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Info => "INFO",
            EventSeverity::Warning => "WARNING",
            EventSeverity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventSeverity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventSeverity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or(())
    }
}

// ---------------------------------------------------------------------------
// EquipmentEvent
// ---------------------------------------------------------------------------

/// A persisted equipment event.
///
/// Serializes in camelCase — the shape delivered to both the query API and
/// WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub equipment_id: EntityId,
    pub equipment_type: Option<String>,
    pub farm_id: EntityId,
    /// Origin time as reported by the producer. May differ from
    /// `received_at` and may arrive out of order across equipment.
    pub timestamp: Timestamp,
    /// Type-specific details (battery level, old/new status, ...).
    pub payload: serde_json::Value,
    pub message: Option<String>,
    pub severity: EventSeverity,
    pub acknowledged: bool,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledged_by: Option<String>,
    /// Ingestion time, stamped by the intake worker.
    pub received_at: Timestamp,
    pub processed: bool,
    pub processing_notes: Option<String>,
}

impl EquipmentEvent {
    /// Apply the acknowledgment transition.
    ///
    /// Sets `acknowledged`, `acknowledged_at`, and `acknowledged_by`; when
    /// `notes` is non-empty the event is additionally marked processed with
    /// the notes recorded. Re-acknowledging an already-acknowledged event
    /// overwrites the acknowledgment metadata.
    ///
    /// Callers must reject an empty `acknowledged_by` before invoking this;
    /// the invariant is that `acknowledged_by` is non-empty whenever
    /// `acknowledged` is true.
    pub fn acknowledge(&mut self, acknowledged_by: &str, notes: Option<&str>, now: Timestamp) {
        self.acknowledged = true;
        self.acknowledged_at = Some(now);
        self.acknowledged_by = Some(acknowledged_by.to_string());

        if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
            self.processed = true;
            self.processing_notes = Some(notes.to_string());
        }
    }

    /// Integer payload field lookup, accepting both JSON numbers and
    /// numeric strings (producers are inconsistent about this).
    pub fn payload_int(&self, key: &str) -> Option<i64> {
        match self.payload.get(key)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String payload field lookup.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// NewEvent
// ---------------------------------------------------------------------------

/// A fully classified event ready for persistence.
///
/// Built by the intake worker from a [`ParsedEvent`](crate::inbound::ParsedEvent);
/// the store assigns the id. New events are always unacknowledged and
/// unprocessed.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub equipment_id: EntityId,
    pub equipment_type: Option<String>,
    pub farm_id: EntityId,
    pub timestamp: Timestamp,
    pub payload: serde_json::Value,
    pub message: Option<String>,
    pub severity: EventSeverity,
    pub received_at: Timestamp,
}

// ---------------------------------------------------------------------------
// EventFilter
// ---------------------------------------------------------------------------

/// Filter criteria for event listing. All fields are optional and combine
/// with AND; date bounds apply to the producer `timestamp`.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub farm_id: Option<EntityId>,
    pub equipment_id: Option<EntityId>,
    pub event_type: Option<EventType>,
    pub severity: Option<EventSeverity>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub acknowledged: Option<bool>,
}

impl EventFilter {
    /// True if no criteria are set.
    pub fn is_empty(&self) -> bool {
        self.farm_id.is_none()
            && self.equipment_id.is_none()
            && self.event_type.is_none()
            && self.severity.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.acknowledged.is_none()
    }

    /// Evaluate the filter against an event.
    pub fn matches(&self, event: &EquipmentEvent) -> bool {
        if self.farm_id.is_some_and(|id| id != event.farm_id) {
            return false;
        }
        if self.equipment_id.is_some_and(|id| id != event.equipment_id) {
            return false;
        }
        if self.event_type.is_some_and(|t| t != event.event_type) {
            return false;
        }
        if self.severity.is_some_and(|s| s != event.severity) {
            return false;
        }
        if self.start_date.is_some_and(|start| event.timestamp < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| event.timestamp > end) {
            return false;
        }
        if self.acknowledged.is_some_and(|a| a != event.acknowledged) {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
