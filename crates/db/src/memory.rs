//! In-memory implementations of [`EventStore`] and [`IngestQueue`].
//!
//! Behavioral twins of the PostgreSQL backend, used by the test suites of
//! the supervision and API crates so the full pipeline can be exercised
//! without a database. [`MemoryEventStore::fail_next_insert`] injects a
//! persistence failure to test the dead-letter route.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use fieldwatch_core::event::{EquipmentEvent, EventFilter, EventSeverity, EventType, NewEvent};
use fieldwatch_core::types::{EventId, Timestamp};

use crate::store::{
    DeadLetter, EventStore, IngestQueue, Page, PageResult, QueuedMessage, StoreError,
};

fn page_slice<T: Clone>(mut items: Vec<T>, page: Page) -> PageResult<T> {
    let total = items.len() as i64;
    let offset = page.offset.max(0) as usize;
    let limit = page.limit.max(0) as usize;

    let items = if offset >= items.len() {
        Vec::new()
    } else {
        items.drain(offset..).take(limit).collect()
    };

    PageResult { items, total }
}

fn sort_newest_first(events: &mut [EquipmentEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

// ---------------------------------------------------------------------------
// MemoryEventStore
// ---------------------------------------------------------------------------

/// [`EventStore`] holding all events in a map.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<EventId, EquipmentEvent>>,
    fail_next_insert: AtomicBool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert` call fail with [`StoreError::Unavailable`].
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Number of stored events (test helper).
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    async fn collect_matching(&self, filter: &EventFilter) -> Vec<EquipmentEvent> {
        let mut matching: Vec<EquipmentEvent> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        sort_newest_first(&mut matching);
        matching
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert(&self, new_event: NewEvent) -> Result<EquipmentEvent, StoreError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected insert failure".into()));
        }

        let event = EquipmentEvent {
            id: Uuid::now_v7(),
            event_type: new_event.event_type,
            equipment_id: new_event.equipment_id,
            equipment_type: new_event.equipment_type,
            farm_id: new_event.farm_id,
            timestamp: new_event.timestamp,
            payload: new_event.payload,
            message: new_event.message,
            severity: new_event.severity,
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
            received_at: new_event.received_at,
            processed: false,
            processing_notes: None,
        };
        self.events.write().await.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get(&self, id: EventId) -> Result<Option<EquipmentEvent>, StoreError> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> Result<PageResult<EquipmentEvent>, StoreError> {
        Ok(page_slice(self.collect_matching(filter).await, page))
    }

    async fn list_unacknowledged_critical(
        &self,
        page: Page,
    ) -> Result<PageResult<EquipmentEvent>, StoreError> {
        let filter = EventFilter {
            severity: Some(EventSeverity::Critical),
            acknowledged: Some(false),
            ..Default::default()
        };
        Ok(page_slice(self.collect_matching(&filter).await, page))
    }

    async fn acknowledge(
        &self,
        id: EventId,
        acknowledged_by: &str,
        notes: Option<&str>,
    ) -> Result<Option<EquipmentEvent>, StoreError> {
        let mut events = self.events.write().await;
        let Some(event) = events.get_mut(&id) else {
            return Ok(None);
        };
        event.acknowledge(acknowledged_by, notes, Utc::now());
        Ok(Some(event.clone()))
    }

    async fn count_events(&self) -> Result<i64, StoreError> {
        Ok(self.events.read().await.len() as i64)
    }

    async fn count_unacknowledged(&self) -> Result<i64, StoreError> {
        Ok(self
            .events
            .read()
            .await
            .values()
            .filter(|e| !e.acknowledged)
            .count() as i64)
    }

    async fn counts_by_severity(&self) -> Result<Vec<(EventSeverity, i64)>, StoreError> {
        let events = self.events.read().await;
        let mut counts: HashMap<EventSeverity, i64> = HashMap::new();
        for event in events.values() {
            *counts.entry(event.severity).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn counts_by_type(&self) -> Result<Vec<(EventType, i64)>, StoreError> {
        let events = self.events.read().await;
        let mut counts: HashMap<EventType, i64> = HashMap::new();
        for event in events.values() {
            *counts.entry(event.event_type).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn recent_by_severity(
        &self,
        severity: EventSeverity,
        limit: i64,
    ) -> Result<Vec<EquipmentEvent>, StoreError> {
        let filter = EventFilter {
            severity: Some(severity),
            ..Default::default()
        };
        let mut matching = self.collect_matching(&filter).await;
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn recent_since(
        &self,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<EquipmentEvent>, StoreError> {
        let filter = EventFilter {
            start_date: Some(since),
            ..Default::default()
        };
        let mut matching = self.collect_matching(&filter).await;
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn daily_counts_since(
        &self,
        since: Timestamp,
    ) -> Result<Vec<(NaiveDate, i64)>, StoreError> {
        let events = self.events.read().await;
        let mut counts: HashMap<NaiveDate, i64> = HashMap::new();
        for event in events.values() {
            if event.timestamp >= since {
                *counts.entry(event.timestamp.date_naive()).or_default() += 1;
            }
        }
        let mut days: Vec<(NaiveDate, i64)> = counts.into_iter().collect();
        days.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(days)
    }

    async fn count_between(&self, start: Timestamp, end: Timestamp) -> Result<i64, StoreError> {
        Ok(self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .count() as i64)
    }
}

// ---------------------------------------------------------------------------
// MemoryIngestQueue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PendingMessage {
    message: QueuedMessage,
    claimed_by: Option<String>,
}

/// [`IngestQueue`] holding messages in memory.
#[derive(Default)]
pub struct MemoryIngestQueue {
    messages: RwLock<Vec<PendingMessage>>,
    dead_letters: RwLock<Vec<DeadLetter>>,
}

impl MemoryIngestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dead-lettered messages (test helper).
    pub async fn dead_letter_count(&self) -> usize {
        self.dead_letters.read().await.len()
    }
}

#[async_trait]
impl IngestQueue for MemoryIngestQueue {
    async fn enqueue(&self, payload: &serde_json::Value) -> Result<Uuid, StoreError> {
        let id = Uuid::now_v7();
        self.messages.write().await.push(PendingMessage {
            message: QueuedMessage {
                id,
                payload: payload.clone(),
                enqueued_at: Utc::now(),
            },
            claimed_by: None,
        });
        Ok(id)
    }

    async fn claim(&self, worker: &str) -> Result<Option<QueuedMessage>, StoreError> {
        let mut messages = self.messages.write().await;
        let Some(pending) = messages.iter_mut().find(|m| m.claimed_by.is_none()) else {
            return Ok(None);
        };
        pending.claimed_by = Some(worker.to_string());
        Ok(Some(pending.message.clone()))
    }

    async fn complete(&self, id: Uuid) -> Result<(), StoreError> {
        self.messages.write().await.retain(|m| m.message.id != id);
        Ok(())
    }

    async fn dead_letter(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        let mut messages = self.messages.write().await;
        let Some(pos) = messages.iter().position(|m| m.message.id == id) else {
            return Ok(());
        };
        let removed = messages.remove(pos);
        self.dead_letters.write().await.push(DeadLetter {
            id: removed.message.id,
            payload: removed.message.payload,
            reason: reason.to_string(),
            failed_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_dead_letters(&self, page: Page) -> Result<PageResult<DeadLetter>, StoreError> {
        let mut letters = self.dead_letters.read().await.clone();
        letters.sort_by(|a, b| b.failed_at.cmp(&a.failed_at));
        Ok(page_slice(letters, page))
    }

    async fn pending_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.claimed_by.is_none())
            .count() as i64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
