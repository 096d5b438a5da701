/// Event primary keys are UUIDv7, assigned at persistence time.
pub type EventId = uuid::Uuid;

/// Foreign identifiers into the equipment/farm services are opaque UUIDs.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
