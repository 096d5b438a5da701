//! Store and queue abstractions.
//!
//! The supervision engine and the API talk to persistence exclusively
//! through [`EventStore`] and [`IngestQueue`], so the whole pipeline can run
//! against either PostgreSQL or the in-memory backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use fieldwatch_core::event::{EquipmentEvent, EventFilter, EventSeverity, EventType, NewEvent};
use fieldwatch_core::types::{EventId, Timestamp};

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Error type for store and queue operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded into a domain type.
    #[error("corrupt row: {0}")]
    Decode(String),

    /// The backend refused the operation (used by fault injection in the
    /// in-memory backend).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Limit/offset pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

/// One page of results plus the unpaginated total.
#[derive(Debug, Clone)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: i64,
}

// ---------------------------------------------------------------------------
// Queue types
// ---------------------------------------------------------------------------

/// A message claimed from the ingest queue.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub enqueued_at: Timestamp,
}

/// A message that could not be processed and was routed to the dead-letter
/// destination. Never retried.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub reason: String,
    pub failed_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DashboardStatistics
// ---------------------------------------------------------------------------

/// Aggregate snapshot served to the dashboard.
///
/// Every field is re-derived from the store at query time; there is no
/// separately maintained counter state to drift out of sync.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    pub total_events: i64,
    pub unacknowledged_events: i64,
    pub critical_events: i64,
    pub warning_events: i64,
    pub info_events: i64,
    pub event_counts_by_type: BTreeMap<String, i64>,
    pub event_counts_by_severity: BTreeMap<String, i64>,
    pub recent_critical_events: Vec<EquipmentEvent>,
    pub recent_events: Vec<EquipmentEvent>,
    /// Per-day counts (`YYYY-MM-DD` keys) over the trailing 30-day window.
    pub daily_event_counts: BTreeMap<String, i64>,
    pub events_last_24_hours: i64,
    pub events_last_7_days: i64,
    pub events_last_30_days: i64,
}

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

/// Durable keyed collection of equipment events.
///
/// All writes are single-row inserts or single-row updates; implementations
/// rely on the backend's per-row atomicity and provide no cross-row
/// coordination.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Cheap reachability probe, used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Persist a new event, assigning its id. Returns the stored record.
    async fn insert(&self, new_event: NewEvent) -> Result<EquipmentEvent, StoreError>;

    /// Fetch one event by id.
    async fn get(&self, id: EventId) -> Result<Option<EquipmentEvent>, StoreError>;

    /// List events matching `filter`, newest producer-timestamp first.
    async fn list(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> Result<PageResult<EquipmentEvent>, StoreError>;

    /// List unacknowledged CRITICAL events, newest first.
    async fn list_unacknowledged_critical(
        &self,
        page: Page,
    ) -> Result<PageResult<EquipmentEvent>, StoreError>;

    /// Apply the acknowledgment transition to one event.
    ///
    /// `notes`, when present, must already be non-blank. Returns the updated
    /// record, or `None` if the id is unknown.
    async fn acknowledge(
        &self,
        id: EventId,
        acknowledged_by: &str,
        notes: Option<&str>,
    ) -> Result<Option<EquipmentEvent>, StoreError>;

    // -- aggregate queries --------------------------------------------------

    /// Total number of stored events.
    async fn count_events(&self) -> Result<i64, StoreError>;

    /// Number of unacknowledged events of any severity.
    async fn count_unacknowledged(&self) -> Result<i64, StoreError>;

    /// Event counts grouped by severity. Severities with no events are
    /// absent from the result.
    async fn counts_by_severity(&self) -> Result<Vec<(EventSeverity, i64)>, StoreError>;

    /// Event counts grouped by event type.
    async fn counts_by_type(&self) -> Result<Vec<(EventType, i64)>, StoreError>;

    /// Most recent events of the given severity, newest first.
    async fn recent_by_severity(
        &self,
        severity: EventSeverity,
        limit: i64,
    ) -> Result<Vec<EquipmentEvent>, StoreError>;

    /// Most recent events with producer timestamp at or after `since`.
    async fn recent_since(
        &self,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<EquipmentEvent>, StoreError>;

    /// Per-day event counts for producer timestamps at or after `since`.
    async fn daily_counts_since(
        &self,
        since: Timestamp,
    ) -> Result<Vec<(NaiveDate, i64)>, StoreError>;

    /// Number of events with producer timestamp in `[start, end]`.
    async fn count_between(&self, start: Timestamp, end: Timestamp) -> Result<i64, StoreError>;
}

// ---------------------------------------------------------------------------
// IngestQueue
// ---------------------------------------------------------------------------

/// Durable queue of raw inbound messages.
///
/// Delivery model: a claimed message is either completed (removed) or
/// dead-lettered (moved, with a reason, to the dead-letter destination).
/// There is no requeue path.
#[async_trait]
pub trait IngestQueue: Send + Sync {
    /// Append a raw message to the queue. Used by producers and tests.
    async fn enqueue(&self, payload: &serde_json::Value) -> Result<Uuid, StoreError>;

    /// Claim the oldest unclaimed message for `worker`, if any.
    ///
    /// A claimed message is invisible to other workers.
    async fn claim(&self, worker: &str) -> Result<Option<QueuedMessage>, StoreError>;

    /// Remove a successfully processed message.
    async fn complete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Move a message to the dead-letter destination with a reason.
    async fn dead_letter(&self, id: Uuid, reason: &str) -> Result<(), StoreError>;

    /// List dead-lettered messages, newest first.
    async fn list_dead_letters(&self, page: Page) -> Result<PageResult<DeadLetter>, StoreError>;

    /// Number of messages waiting to be claimed.
    async fn pending_count(&self) -> Result<i64, StoreError>;
}
