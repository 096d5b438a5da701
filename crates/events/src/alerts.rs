//! Alert engine.
//!
//! Subscribes to the event bus and runs a type-specific handler for every
//! persisted event whose severity requires attention. Handlers are
//! notification side effects (structured log records today; external
//! notification transports are collaborator concerns). Handler dispatch is
//! a total mapping over the closed event-type set, so adding a type forces
//! a decision here.
//!
//! Escalation is exposed as a query surface ([`AlertEngine::pending_escalations`])
//! built on the pure predicate in `fieldwatch_core::escalation`; nothing in
//! this crate evaluates it periodically.

use chrono::Utc;
use tokio::sync::broadcast;

use fieldwatch_core::escalation::should_escalate;
use fieldwatch_core::event::{EquipmentEvent, EventType};
use fieldwatch_db::store::{EventStore, Page, StoreError};

/// A type-specific alert side effect.
pub type AlertHandler = fn(&EquipmentEvent);

/// Background service running alert handlers for attention-worthy events.
pub struct AlertEngine;

impl AlertEngine {
    /// Run the alert loop.
    ///
    /// Consumes events from the bus via `receiver`; exits when the channel
    /// closes (i.e. the [`EventBus`](crate::bus::EventBus) is dropped).
    /// Handler failures can never reach the intake path.
    pub async fn run(mut receiver: broadcast::Receiver<EquipmentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if event.severity.requires_attention() {
                        process_alert(&event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Alert engine lagged, some alerts were skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, alert engine shutting down");
                    break;
                }
            }
        }
    }

    /// List unacknowledged critical events that currently satisfy the
    /// escalation predicate, newest first.
    pub async fn pending_escalations(
        store: &dyn EventStore,
        page: Page,
    ) -> Result<Vec<EquipmentEvent>, StoreError> {
        let now = Utc::now();
        let critical = store.list_unacknowledged_critical(page).await?;
        Ok(critical
            .items
            .into_iter()
            .filter(|event| should_escalate(event, now))
            .collect())
    }
}

/// Run the handler for an attention-worthy event.
pub fn process_alert(event: &EquipmentEvent) {
    tracing::warn!(
        event_id = %event.id,
        event_type = %event.event_type,
        severity = %event.severity,
        "Processing alert"
    );

    match handler_for(event.event_type) {
        Some(handler) => handler(event),
        None => tracing::info!(
            event_type = %event.event_type,
            "No specific alert action for event type"
        ),
    }
}

/// Total mapping from event type to its alert handler.
///
/// `None` means the type has no specific alert action.
pub fn handler_for(event_type: EventType) -> Option<AlertHandler> {
    match event_type {
        EventType::BatteryLow => Some(handle_battery_low),
        EventType::SensorOffline => Some(handle_sensor_offline),
        EventType::EquipmentFailure => Some(handle_equipment_failure),
        EventType::StatusChanged => Some(handle_status_changed),
        EventType::MaintenanceScheduled => Some(handle_maintenance_scheduled),
        EventType::EquipmentCreated
        | EventType::MaintenanceCompleted
        | EventType::SystemAlert => None,
    }
}

fn handle_battery_low(event: &EquipmentEvent) {
    tracing::error!(
        equipment_id = %event.equipment_id,
        farm_id = %event.farm_id,
        battery_level = event.payload_int("batteryLevel"),
        "CRITICAL: low battery detected"
    );
}

fn handle_sensor_offline(event: &EquipmentEvent) {
    tracing::error!(
        equipment_id = %event.equipment_id,
        farm_id = %event.farm_id,
        last_communication = event.payload_str("lastCommunication"),
        "CRITICAL: sensor is offline"
    );
}

fn handle_equipment_failure(event: &EquipmentEvent) {
    tracing::error!(
        equipment_id = %event.equipment_id,
        farm_id = %event.farm_id,
        "CRITICAL: equipment failure detected"
    );
}

fn handle_status_changed(event: &EquipmentEvent) {
    tracing::warn!(
        equipment_id = %event.equipment_id,
        farm_id = %event.farm_id,
        old_status = event.payload_str("oldStatus").unwrap_or("UNKNOWN"),
        new_status = event.payload_str("newStatus").unwrap_or("UNKNOWN"),
        "Equipment status changed"
    );
}

fn handle_maintenance_scheduled(event: &EquipmentEvent) {
    tracing::info!(
        equipment_id = %event.equipment_id,
        farm_id = %event.farm_id,
        "Maintenance scheduled for equipment"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
