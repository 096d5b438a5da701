//! Row structs mapping database rows into domain types.
//!
//! Kept private to this crate: the rest of the workspace only sees the
//! `fieldwatch_core` entities. Enum columns are stored as their wire text
//! and parsed on the way out; a row with an unknown tag is reported as
//! [`StoreError::Decode`](crate::store::StoreError::Decode) rather than
//! silently dropped.

use sqlx::FromRow;
use uuid::Uuid;

use fieldwatch_core::event::{EquipmentEvent, EventSeverity, EventType};
use fieldwatch_core::types::Timestamp;

use crate::store::{DeadLetter, QueuedMessage, StoreError};

/// A row from the `equipment_events` table.
#[derive(Debug, FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub event_type: String,
    pub equipment_id: Uuid,
    pub equipment_type: Option<String>,
    pub farm_id: Uuid,
    pub timestamp: Timestamp,
    pub payload: serde_json::Value,
    pub message: Option<String>,
    pub severity: String,
    pub acknowledged: bool,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledged_by: Option<String>,
    pub received_at: Timestamp,
    pub processed: bool,
    pub processing_notes: Option<String>,
}

impl TryFrom<EventRow> for EquipmentEvent {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type: EventType = row
            .event_type
            .parse()
            .map_err(|()| StoreError::Decode(format!("unknown event_type {:?}", row.event_type)))?;
        let severity: EventSeverity = row
            .severity
            .parse()
            .map_err(|()| StoreError::Decode(format!("unknown severity {:?}", row.severity)))?;

        Ok(EquipmentEvent {
            id: row.id,
            event_type,
            equipment_id: row.equipment_id,
            equipment_type: row.equipment_type,
            farm_id: row.farm_id,
            timestamp: row.timestamp,
            payload: row.payload,
            message: row.message,
            severity,
            acknowledged: row.acknowledged,
            acknowledged_at: row.acknowledged_at,
            acknowledged_by: row.acknowledged_by,
            received_at: row.received_at,
            processed: row.processed,
            processing_notes: row.processing_notes,
        })
    }
}

/// A row from the `ingest_messages` table.
#[derive(Debug, FromRow)]
pub(crate) struct QueueRow {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub enqueued_at: Timestamp,
}

impl From<QueueRow> for QueuedMessage {
    fn from(row: QueueRow) -> Self {
        QueuedMessage {
            id: row.id,
            payload: row.payload,
            enqueued_at: row.enqueued_at,
        }
    }
}

/// A row from the `dead_letter_messages` table.
#[derive(Debug, FromRow)]
pub(crate) struct DeadLetterRow {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub reason: String,
    pub failed_at: Timestamp,
}

impl From<DeadLetterRow> for DeadLetter {
    fn from(row: DeadLetterRow) -> Self {
        DeadLetter {
            id: row.id,
            payload: row.payload,
            reason: row.reason,
            failed_at: row.failed_at,
        }
    }
}
