//! Parsing of raw inbound queue messages.
//!
//! Producers publish loosely-typed JSON; [`parse_message`] turns a message
//! into a [`ParsedEvent`] or rejects it as [`MalformedEvent`]. A malformed
//! message is never persisted — the intake worker routes it to the
//! dead-letter destination instead.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::event::EventType;
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// MalformedEvent
// ---------------------------------------------------------------------------

/// An inbound message that cannot be turned into a well-formed event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEvent {
    #[error("Message body is not a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown event type: {0:?}")]
    UnknownEventType(String),

    #[error("Field {field} is not a valid identifier: {value:?}")]
    InvalidId { field: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// ParsedEvent
// ---------------------------------------------------------------------------

/// A validated inbound message, not yet classified or stamped.
///
/// `timestamp` is `None` when the producer omitted it or sent something
/// unparsable; the intake worker substitutes the ingestion time (with a
/// warning) rather than rejecting the message.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub event_type: EventType,
    pub equipment_id: EntityId,
    pub equipment_type: Option<String>,
    pub farm_id: EntityId,
    pub timestamp: Option<Timestamp>,
    pub payload: Value,
    pub message: Option<String>,
}

/// Parse a raw queue message.
///
/// Required fields: `eventType` (one of the closed set), `equipmentId`,
/// `farmId` (UUIDs). Optional: `equipmentType`, `timestamp` (ISO-8601),
/// `message`, `metadata` (open object, becomes the event payload).
pub fn parse_message(raw: &Value) -> Result<ParsedEvent, MalformedEvent> {
    let obj = raw.as_object().ok_or(MalformedEvent::NotAnObject)?;

    let event_type_str = required_str(obj, "eventType")?;
    let event_type: EventType = event_type_str
        .parse()
        .map_err(|()| MalformedEvent::UnknownEventType(event_type_str.to_string()))?;

    let equipment_id = required_id(obj, "equipmentId")?;
    let farm_id = required_id(obj, "farmId")?;

    let timestamp = obj
        .get("timestamp")
        .and_then(|v| v.as_str())
        .and_then(parse_timestamp);

    let payload = match obj.get("metadata") {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => Value::Object(Default::default()),
    };

    Ok(ParsedEvent {
        event_type,
        equipment_id,
        equipment_type: optional_str(obj, "equipmentType"),
        farm_id,
        timestamp,
        payload,
        message: optional_str(obj, "message"),
    })
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (offset-carrying) or a naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// which is interpreted as UTC.
fn parse_timestamp(s: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn required_str<'a>(
    obj: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, MalformedEvent> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(MalformedEvent::MissingField(field))
}

fn required_id(
    obj: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<EntityId, MalformedEvent> {
    let s = required_str(obj, field)?;
    s.parse().map_err(|_| MalformedEvent::InvalidId {
        field,
        value: s.to_string(),
    })
}

fn optional_str(obj: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
