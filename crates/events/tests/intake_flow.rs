//! End-to-end pipeline tests over the in-memory backends:
//! enqueue → intake pool → store → bus, plus acknowledgment, escalation,
//! and dashboard statistics.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use fieldwatch_core::escalation::should_escalate;
use fieldwatch_core::event::{EventFilter, EventSeverity, EventType, NewEvent};
use fieldwatch_db::store::{EventStore, IngestQueue, Page};
use fieldwatch_db::{MemoryEventStore, MemoryIngestQueue};
use fieldwatch_events::alerts::AlertEngine;
use fieldwatch_events::{EventBus, IntakeConfig, IntakePool, StatisticsAggregator};

struct Pipeline {
    store: Arc<MemoryEventStore>,
    queue: Arc<MemoryIngestQueue>,
    bus: Arc<EventBus>,
    cancel: CancellationToken,
}

impl Pipeline {
    fn start(workers: usize) -> Self {
        let store = Arc::new(MemoryEventStore::new());
        let queue = Arc::new(MemoryIngestQueue::new());
        let bus = Arc::new(EventBus::default());
        let cancel = CancellationToken::new();

        let config = IntakeConfig {
            workers,
            min_poll_interval: Duration::from_millis(5),
            max_poll_interval: Duration::from_millis(50),
        };
        let pool = IntakePool::new(
            store.clone() as Arc<dyn EventStore>,
            queue.clone() as Arc<dyn IngestQueue>,
            Arc::clone(&bus),
            config,
        );
        pool.spawn(cancel.clone());

        Self {
            store,
            queue,
            bus,
            cancel,
        }
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Poll `cond` until it holds or two seconds elapse.
async fn wait_until<F, Fut>(what: &str, mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if cond().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn message(event_type: &str, equipment_id: Uuid, farm_id: Uuid, metadata: Value) -> Value {
    json!({
        "eventType": event_type,
        "equipmentId": equipment_id.to_string(),
        "farmId": farm_id.to_string(),
        "equipmentType": "SENSOR",
        "timestamp": Utc::now().to_rfc3339(),
        "message": "test event",
        "metadata": metadata,
    })
}

fn stored_new_event(
    event_type: EventType,
    farm_id: Uuid,
    received_minutes_ago: i64,
    payload: Value,
) -> NewEvent {
    let received_at = Utc::now() - chrono::Duration::minutes(received_minutes_ago);
    NewEvent {
        event_type,
        equipment_id: Uuid::new_v4(),
        equipment_type: None,
        farm_id,
        timestamp: received_at,
        payload,
        message: None,
        severity: EventSeverity::for_event_type(event_type),
        received_at,
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn battery_low_message_is_classified_critical_and_fanned_out() {
    let pipeline = Pipeline::start(3);
    let mut rx = pipeline.bus.subscribe();

    let equipment_id = Uuid::new_v4();
    let farm_id = Uuid::new_v4();
    pipeline
        .queue
        .enqueue(&message(
            "BATTERY_LOW",
            equipment_id,
            farm_id,
            json!({"batteryLevel": 5}),
        ))
        .await
        .unwrap();

    wait_until("event to be persisted", || async {
        pipeline.store.event_count().await == 1
    })
    .await;

    let page = pipeline
        .store
        .list(&EventFilter::default(), Page::default())
        .await
        .unwrap();
    let stored = &page.items[0];
    assert_eq!(stored.event_type, EventType::BatteryLow);
    assert_eq!(stored.severity, EventSeverity::Critical);
    assert_eq!(stored.equipment_id, equipment_id);
    assert_eq!(stored.farm_id, farm_id);
    assert!(!stored.acknowledged);
    assert!(should_escalate(stored, Utc::now()));

    // Fan-out: subscribers see the persisted record.
    let broadcasted = rx.recv().await.expect("subscriber should receive event");
    assert_eq!(broadcasted.id, stored.id);

    assert_eq!(pipeline.queue.pending_count().await.unwrap(), 0);
    assert_eq!(pipeline.queue.dead_letter_count().await, 0);

    pipeline.stop();
}

#[tokio::test]
async fn status_changed_message_is_classified_warning() {
    let pipeline = Pipeline::start(1);

    pipeline
        .queue
        .enqueue(&message(
            "STATUS_CHANGED",
            Uuid::new_v4(),
            Uuid::new_v4(),
            json!({"oldStatus": "ACTIVE", "newStatus": "MAINTENANCE"}),
        ))
        .await
        .unwrap();

    wait_until("event to be persisted", || async {
        pipeline.store.event_count().await == 1
    })
    .await;

    let page = pipeline
        .store
        .list(&EventFilter::default(), Page::default())
        .await
        .unwrap();
    assert_eq!(page.items[0].severity, EventSeverity::Warning);
    assert_eq!(page.items[0].payload["newStatus"], "MAINTENANCE");

    pipeline.stop();
}

#[tokio::test]
async fn malformed_message_is_dead_lettered_and_never_persisted() {
    let pipeline = Pipeline::start(2);

    let mut msg = message("BATTERY_LOW", Uuid::new_v4(), Uuid::new_v4(), json!({}));
    msg.as_object_mut().unwrap().remove("equipmentId");
    pipeline.queue.enqueue(&msg).await.unwrap();

    wait_until("message to be dead-lettered", || async {
        pipeline.queue.dead_letter_count().await == 1
    })
    .await;

    assert_eq!(pipeline.store.event_count().await, 0);

    let letters = pipeline
        .queue
        .list_dead_letters(Page::default())
        .await
        .unwrap();
    assert_eq!(letters.total, 1);
    assert!(letters.items[0].reason.contains("equipmentId"));

    pipeline.stop();
}

#[tokio::test]
async fn persistence_failure_is_dead_lettered() {
    let pipeline = Pipeline::start(1);
    pipeline.store.fail_next_insert();

    pipeline
        .queue
        .enqueue(&message(
            "SENSOR_OFFLINE",
            Uuid::new_v4(),
            Uuid::new_v4(),
            json!({}),
        ))
        .await
        .unwrap();

    wait_until("message to be dead-lettered", || async {
        pipeline.queue.dead_letter_count().await == 1
    })
    .await;

    assert_eq!(pipeline.store.event_count().await, 0);
    let letters = pipeline
        .queue
        .list_dead_letters(Page::default())
        .await
        .unwrap();
    assert!(letters.items[0].reason.contains("persistence failed"));

    pipeline.stop();
}

#[tokio::test]
async fn missing_timestamp_falls_back_to_ingestion_time() {
    let pipeline = Pipeline::start(1);

    let mut msg = message("SYSTEM_ALERT", Uuid::new_v4(), Uuid::new_v4(), json!({}));
    msg.as_object_mut().unwrap().remove("timestamp");
    pipeline.queue.enqueue(&msg).await.unwrap();

    wait_until("event to be persisted", || async {
        pipeline.store.event_count().await == 1
    })
    .await;

    let page = pipeline
        .store
        .list(&EventFilter::default(), Page::default())
        .await
        .unwrap();
    assert_eq!(page.items[0].timestamp, page.items[0].received_at);

    pipeline.stop();
}

#[tokio::test]
async fn pool_drains_queue_exactly_once_per_message() {
    let pipeline = Pipeline::start(3);

    let farm_id = Uuid::new_v4();
    let equipment_ids: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();
    for equipment_id in &equipment_ids {
        pipeline
            .queue
            .enqueue(&message("EQUIPMENT_CREATED", *equipment_id, farm_id, json!({})))
            .await
            .unwrap();
    }

    wait_until("all messages to be persisted", || async {
        pipeline.store.event_count().await == equipment_ids.len()
    })
    .await;

    assert_eq!(pipeline.queue.pending_count().await.unwrap(), 0);
    assert_eq!(pipeline.queue.dead_letter_count().await, 0);

    // Every message produced exactly one event.
    let page = pipeline
        .store
        .list(&EventFilter::default(), Page::new(100, 0))
        .await
        .unwrap();
    let mut seen: Vec<Uuid> = page.items.iter().map(|e| e.equipment_id).collect();
    seen.sort();
    let mut expected = equipment_ids.clone();
    expected.sort();
    assert_eq!(seen, expected);

    pipeline.stop();
}

// ---------------------------------------------------------------------------
// Acknowledgment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn acknowledging_with_notes_marks_processed_and_clears_critical_filter() {
    let pipeline = Pipeline::start(1);

    let farm_id = Uuid::new_v4();
    pipeline
        .queue
        .enqueue(&message(
            "BATTERY_LOW",
            Uuid::new_v4(),
            farm_id,
            json!({"batteryLevel": 5}),
        ))
        .await
        .unwrap();

    wait_until("event to be persisted", || async {
        pipeline.store.event_count().await == 1
    })
    .await;

    let unacknowledged_critical = EventFilter {
        farm_id: Some(farm_id),
        severity: Some(EventSeverity::Critical),
        acknowledged: Some(false),
        ..Default::default()
    };
    let before = pipeline
        .store
        .list(&unacknowledged_critical, Page::default())
        .await
        .unwrap();
    assert_eq!(before.total, 1);
    let event_id = before.items[0].id;

    let updated = pipeline
        .store
        .acknowledge(event_id, "ops1", Some("replaced"))
        .await
        .unwrap()
        .expect("event should exist");
    assert!(updated.acknowledged);
    assert!(updated.acknowledged_at.is_some());
    assert_eq!(updated.acknowledged_by.as_deref(), Some("ops1"));
    assert!(updated.processed);
    assert_eq!(updated.processing_notes.as_deref(), Some("replaced"));

    let after = pipeline
        .store
        .list(&unacknowledged_critical, Page::default())
        .await
        .unwrap();
    assert_eq!(after.total, 0);

    pipeline.stop();
}

// ---------------------------------------------------------------------------
// Escalation surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pending_escalations_apply_the_predicate() {
    let store = MemoryEventStore::new();
    let farm_id = Uuid::new_v4();

    let stale = store
        .insert(stored_new_event(EventType::SensorOffline, farm_id, 31, json!({})))
        .await
        .unwrap();
    let fresh = store
        .insert(stored_new_event(EventType::SensorOffline, farm_id, 5, json!({})))
        .await
        .unwrap();
    let low_battery = store
        .insert(stored_new_event(
            EventType::BatteryLow,
            farm_id,
            1,
            json!({"batteryLevel": 5}),
        ))
        .await
        .unwrap();
    let acknowledged = store
        .insert(stored_new_event(EventType::EquipmentFailure, farm_id, 45, json!({})))
        .await
        .unwrap();
    store
        .acknowledge(acknowledged.id, "ops1", None)
        .await
        .unwrap();

    let escalations = AlertEngine::pending_escalations(&store, Page::new(100, 0))
        .await
        .unwrap();
    let ids: Vec<_> = escalations.iter().map(|e| e.id).collect();

    assert!(ids.contains(&stale.id));
    assert!(ids.contains(&low_battery.id));
    assert!(!ids.contains(&fresh.id));
    assert!(!ids.contains(&acknowledged.id));
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

fn sum_counts(counts: &std::collections::BTreeMap<String, i64>) -> i64 {
    counts.values().sum()
}

#[tokio::test]
async fn dashboard_statistics_are_internally_consistent() {
    let store = Arc::new(MemoryEventStore::new());
    let farm_id = Uuid::new_v4();

    // A spread of severities and ages: three fresh, one 3 days old, one
    // 12 days old, one outside every window (40 days).
    let fresh_types = [
        EventType::BatteryLow,
        EventType::StatusChanged,
        EventType::EquipmentCreated,
    ];
    for event_type in fresh_types {
        store
            .insert(stored_new_event(event_type, farm_id, 10, json!({})))
            .await
            .unwrap();
    }
    store
        .insert(stored_new_event(
            EventType::SensorOffline,
            farm_id,
            3 * 24 * 60,
            json!({}),
        ))
        .await
        .unwrap();
    store
        .insert(stored_new_event(
            EventType::MaintenanceScheduled,
            farm_id,
            12 * 24 * 60,
            json!({}),
        ))
        .await
        .unwrap();
    store
        .insert(stored_new_event(
            EventType::SystemAlert,
            farm_id,
            40 * 24 * 60,
            json!({}),
        ))
        .await
        .unwrap();

    let aggregator = StatisticsAggregator::new(store.clone() as Arc<dyn EventStore>);
    let stats = aggregator.dashboard_statistics().await.unwrap();

    assert_eq!(stats.total_events, 6);
    assert_eq!(stats.total_events, sum_counts(&stats.event_counts_by_severity));
    assert_eq!(stats.total_events, sum_counts(&stats.event_counts_by_type));
    assert_eq!(
        stats.total_events,
        stats.critical_events + stats.warning_events + stats.info_events
    );
    assert_eq!(stats.unacknowledged_events, 6);

    assert_eq!(stats.critical_events, 2);
    assert_eq!(stats.warning_events, 2);
    assert_eq!(stats.info_events, 2);

    // Window monotonicity.
    assert!(stats.events_last_24_hours <= stats.events_last_7_days);
    assert!(stats.events_last_7_days <= stats.events_last_30_days);
    assert_eq!(stats.events_last_24_hours, 3);
    assert_eq!(stats.events_last_7_days, 4);
    assert_eq!(stats.events_last_30_days, 5);

    // Recent listings.
    assert_eq!(stats.recent_critical_events.len(), 2);
    assert!(stats
        .recent_critical_events
        .iter()
        .all(|e| e.severity == EventSeverity::Critical));
    assert_eq!(stats.recent_events.len(), 3);

    // Daily counts cover exactly the 30-day window.
    assert_eq!(sum_counts(&stats.daily_event_counts), 5);
}

#[tokio::test]
async fn dashboard_statistics_on_empty_store() {
    let store = Arc::new(MemoryEventStore::new());
    let aggregator = StatisticsAggregator::new(store as Arc<dyn EventStore>);

    let stats = aggregator.dashboard_statistics().await.unwrap();

    assert_eq!(stats.total_events, 0);
    assert_eq!(stats.unacknowledged_events, 0);
    assert!(stats.event_counts_by_type.is_empty());
    assert!(stats.recent_critical_events.is_empty());
    assert!(stats.daily_event_counts.is_empty());
    assert_eq!(stats.events_last_30_days, 0);
}
