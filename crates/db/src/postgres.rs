//! PostgreSQL implementations of [`EventStore`] and [`IngestQueue`].
//!
//! All writes are single-row statements; the acknowledgment update and the
//! dead-letter move are the only multi-statement paths, and the latter runs
//! in its own transaction so a message is never both queued and
//! dead-lettered.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use fieldwatch_core::event::{EquipmentEvent, EventFilter, EventSeverity, EventType, NewEvent};
use fieldwatch_core::types::{EventId, Timestamp};

use crate::models::{DeadLetterRow, EventRow, QueueRow};
use crate::store::{
    DeadLetter, EventStore, IngestQueue, Page, PageResult, QueuedMessage, StoreError,
};
use crate::DbPool;

/// Column list for `equipment_events` queries.
const EVENT_COLUMNS: &str = "id, event_type, equipment_id, equipment_type, farm_id, timestamp, \
     payload, message, severity, acknowledged, acknowledged_at, acknowledged_by, received_at, \
     processed, processing_notes";

/// Shared filter clause for `list` queries; `$1..$7` are the filter binds.
///
/// Mirrors the multi-criteria lookup the dashboard issues: every criterion
/// is optional and combines with AND.
const FILTER_WHERE: &str = "($1::uuid IS NULL OR farm_id = $1) \
     AND ($2::uuid IS NULL OR equipment_id = $2) \
     AND ($3::text IS NULL OR event_type = $3) \
     AND ($4::text IS NULL OR severity = $4) \
     AND ($5::timestamptz IS NULL OR timestamp >= $5) \
     AND ($6::timestamptz IS NULL OR timestamp <= $6) \
     AND ($7::boolean IS NULL OR acknowledged = $7)";

// ---------------------------------------------------------------------------
// PgEventStore
// ---------------------------------------------------------------------------

/// [`EventStore`] backed by the `equipment_events` table.
pub struct PgEventStore {
    pool: DbPool,
}

impl PgEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn rows_to_events(rows: Vec<EventRow>) -> Result<Vec<EquipmentEvent>, StoreError> {
    rows.into_iter().map(EquipmentEvent::try_from).collect()
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, new_event: NewEvent) -> Result<EquipmentEvent, StoreError> {
        let query = format!(
            "INSERT INTO equipment_events \
                (id, event_type, equipment_id, equipment_type, farm_id, timestamp, payload, \
                 message, severity, acknowledged, received_at, processed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, false, $10, false) \
             RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&query)
            .bind(Uuid::now_v7())
            .bind(new_event.event_type.as_str())
            .bind(new_event.equipment_id)
            .bind(new_event.equipment_type.as_deref())
            .bind(new_event.farm_id)
            .bind(new_event.timestamp)
            .bind(&new_event.payload)
            .bind(new_event.message.as_deref())
            .bind(new_event.severity.as_str())
            .bind(new_event.received_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn get(&self, id: EventId) -> Result<Option<EquipmentEvent>, StoreError> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM equipment_events WHERE id = $1");
        let row = sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(EquipmentEvent::try_from).transpose()
    }

    async fn list(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> Result<PageResult<EquipmentEvent>, StoreError> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM equipment_events \
             WHERE {FILTER_WHERE} \
             ORDER BY timestamp DESC \
             LIMIT $8 OFFSET $9"
        );
        let rows = sqlx::query_as::<_, EventRow>(&query)
            .bind(filter.farm_id)
            .bind(filter.equipment_id)
            .bind(filter.event_type.map(|t| t.as_str()))
            .bind(filter.severity.map(|s| s.as_str()))
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.acknowledged)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_query =
            format!("SELECT COUNT(*) FROM equipment_events WHERE {FILTER_WHERE}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(filter.farm_id)
            .bind(filter.equipment_id)
            .bind(filter.event_type.map(|t| t.as_str()))
            .bind(filter.severity.map(|s| s.as_str()))
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.acknowledged)
            .fetch_one(&self.pool)
            .await?;

        Ok(PageResult {
            items: rows_to_events(rows)?,
            total,
        })
    }

    async fn list_unacknowledged_critical(
        &self,
        page: Page,
    ) -> Result<PageResult<EquipmentEvent>, StoreError> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM equipment_events \
             WHERE acknowledged = false AND severity = $1 \
             ORDER BY timestamp DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, EventRow>(&query)
            .bind(EventSeverity::Critical.as_str())
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM equipment_events WHERE acknowledged = false AND severity = $1",
        )
        .bind(EventSeverity::Critical.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(PageResult {
            items: rows_to_events(rows)?,
            total,
        })
    }

    async fn acknowledge(
        &self,
        id: EventId,
        acknowledged_by: &str,
        notes: Option<&str>,
    ) -> Result<Option<EquipmentEvent>, StoreError> {
        let query = format!(
            "UPDATE equipment_events SET \
                acknowledged = true, \
                acknowledged_at = NOW(), \
                acknowledged_by = $2, \
                processed = (processed OR $3::text IS NOT NULL), \
                processing_notes = COALESCE($3, processing_notes) \
             WHERE id = $1 \
             RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .bind(acknowledged_by)
            .bind(notes)
            .fetch_optional(&self.pool)
            .await?;
        row.map(EquipmentEvent::try_from).transpose()
    }

    async fn count_events(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM equipment_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_unacknowledged(&self) -> Result<i64, StoreError> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM equipment_events WHERE acknowledged = false")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn counts_by_severity(&self) -> Result<Vec<(EventSeverity, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT severity, COUNT(*) FROM equipment_events GROUP BY severity",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(severity, count)| {
                severity
                    .parse::<EventSeverity>()
                    .map(|s| (s, count))
                    .map_err(|()| StoreError::Decode(format!("unknown severity {severity:?}")))
            })
            .collect()
    }

    async fn counts_by_type(&self) -> Result<Vec<(EventType, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT event_type, COUNT(*) FROM equipment_events GROUP BY event_type",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(event_type, count)| {
                event_type
                    .parse::<EventType>()
                    .map(|t| (t, count))
                    .map_err(|()| StoreError::Decode(format!("unknown event_type {event_type:?}")))
            })
            .collect()
    }

    async fn recent_by_severity(
        &self,
        severity: EventSeverity,
        limit: i64,
    ) -> Result<Vec<EquipmentEvent>, StoreError> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM equipment_events \
             WHERE severity = $1 \
             ORDER BY timestamp DESC \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, EventRow>(&query)
            .bind(severity.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows_to_events(rows)
    }

    async fn recent_since(
        &self,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<EquipmentEvent>, StoreError> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM equipment_events \
             WHERE timestamp >= $1 \
             ORDER BY timestamp DESC \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, EventRow>(&query)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows_to_events(rows)
    }

    async fn daily_counts_since(
        &self,
        since: Timestamp,
    ) -> Result<Vec<(NaiveDate, i64)>, StoreError> {
        let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
            "SELECT CAST(timestamp AS date) AS day, COUNT(*) \
             FROM equipment_events \
             WHERE timestamp >= $1 \
             GROUP BY day \
             ORDER BY day DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_between(&self, start: Timestamp, end: Timestamp) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM equipment_events WHERE timestamp BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// PgIngestQueue
// ---------------------------------------------------------------------------

/// [`IngestQueue`] backed by the `ingest_messages` and
/// `dead_letter_messages` tables.
pub struct PgIngestQueue {
    pool: DbPool,
}

impl PgIngestQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngestQueue for PgIngestQueue {
    async fn enqueue(&self, payload: &serde_json::Value) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar(
            "INSERT INTO ingest_messages (id, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(Uuid::now_v7())
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn claim(&self, worker: &str) -> Result<Option<QueuedMessage>, StoreError> {
        // SKIP LOCKED keeps concurrent workers from blocking on the same row.
        let row = sqlx::query_as::<_, QueueRow>(
            "UPDATE ingest_messages SET claimed_at = NOW(), claimed_by = $1 \
             WHERE id = ( \
                 SELECT id FROM ingest_messages \
                 WHERE claimed_at IS NULL \
                 ORDER BY enqueued_at \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, payload, enqueued_at",
        )
        .bind(worker)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(QueuedMessage::from))
    }

    async fn complete(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM ingest_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn dead_letter(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "INSERT INTO dead_letter_messages (id, payload, reason, failed_at) \
             SELECT id, payload, $2, NOW() FROM ingest_messages WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() > 0 {
            sqlx::query("DELETE FROM ingest_messages WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        } else {
            tracing::warn!(message_id = %id, "Dead-letter requested for unknown message");
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_dead_letters(&self, page: Page) -> Result<PageResult<DeadLetter>, StoreError> {
        let rows = sqlx::query_as::<_, DeadLetterRow>(
            "SELECT id, payload, reason, failed_at FROM dead_letter_messages \
             ORDER BY failed_at DESC \
             LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dead_letter_messages")
            .fetch_one(&self.pool)
            .await?;

        Ok(PageResult {
            items: rows.into_iter().map(DeadLetter::from).collect(),
            total,
        })
    }

    async fn pending_count(&self) -> Result<i64, StoreError> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM ingest_messages WHERE claimed_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
