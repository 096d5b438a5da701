//! Handler-level tests driving the full router against the in-memory
//! backends.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use fieldwatch_api::config::ServerConfig;
use fieldwatch_api::routes;
use fieldwatch_api::state::AppState;
use fieldwatch_api::ws::WsManager;
use fieldwatch_core::event::{EventSeverity, EventType, NewEvent};
use fieldwatch_db::store::{EventStore, IngestQueue};
use fieldwatch_db::{MemoryEventStore, MemoryIngestQueue};
use fieldwatch_events::EventBus;

struct TestApp {
    app: Router,
    store: Arc<MemoryEventStore>,
    queue: Arc<MemoryIngestQueue>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryEventStore::new());
    let queue = Arc::new(MemoryIngestQueue::new());

    let state = AppState {
        store: store.clone() as Arc<dyn EventStore>,
        queue: queue.clone() as Arc<dyn IngestQueue>,
        bus: Arc::new(EventBus::default()),
        ws_manager: Arc::new(WsManager::new()),
        config: Arc::new(ServerConfig::from_env()),
    };

    TestApp {
        app: routes::app(state),
        store,
        queue,
    }
}

fn new_event(event_type: EventType, farm_id: Uuid, received_minutes_ago: i64) -> NewEvent {
    let received_at = Utc::now() - chrono::Duration::minutes(received_minutes_ago);
    NewEvent {
        event_type,
        equipment_id: Uuid::new_v4(),
        equipment_type: Some("SENSOR".to_string()),
        farm_id,
        timestamp: received_at,
        payload: json!({"batteryLevel": 50}),
        message: Some("test".to_string()),
        severity: EventSeverity::for_event_type(event_type),
        received_at,
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok_with_reachable_store() {
    let t = test_app();
    t.queue.enqueue(&json!({"pending": true})).await.unwrap();

    let (status, body) = get(&t.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store_healthy"], true);
    assert_eq!(body["queue_depth"], 1);
}

// ---------------------------------------------------------------------------
// Event listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_events_on_empty_store() {
    let t = test_app();
    let (status, body) = get(&t.app, "/api/v1/events").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["total"], 0);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["offset"], 0);
}

#[tokio::test]
async fn list_events_applies_filters() {
    let t = test_app();
    let farm_a = Uuid::new_v4();
    let farm_b = Uuid::new_v4();

    t.store
        .insert(new_event(EventType::BatteryLow, farm_a, 5))
        .await
        .unwrap();
    t.store
        .insert(new_event(EventType::EquipmentCreated, farm_a, 4))
        .await
        .unwrap();
    t.store
        .insert(new_event(EventType::SensorOffline, farm_b, 3))
        .await
        .unwrap();

    let uri = format!("/api/v1/events?farmId={farm_a}&severity=CRITICAL&acknowledged=false");
    let (status, body) = get(&t.app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["eventType"], "BATTERY_LOW");
    assert_eq!(body["data"][0]["farmId"], farm_a.to_string());
}

#[tokio::test]
async fn list_events_paginates_newest_first() {
    let t = test_app();
    let farm_id = Uuid::new_v4();
    for minutes in [30, 20, 10] {
        t.store
            .insert(new_event(EventType::StatusChanged, farm_id, minutes))
            .await
            .unwrap();
    }

    let (status, body) = get(&t.app, "/api/v1/events?limit=2&offset=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let first: chrono::DateTime<Utc> =
        serde_json::from_value(body["data"][0]["timestamp"].clone()).unwrap();
    let second: chrono::DateTime<Utc> =
        serde_json::from_value(body["data"][1]["timestamp"].clone()).unwrap();
    assert!(first > second);
}

#[tokio::test]
async fn unacknowledged_critical_listing() {
    let t = test_app();
    let farm_id = Uuid::new_v4();

    let critical = t
        .store
        .insert(new_event(EventType::EquipmentFailure, farm_id, 5))
        .await
        .unwrap();
    t.store
        .insert(new_event(EventType::StatusChanged, farm_id, 5))
        .await
        .unwrap();
    let acked = t
        .store
        .insert(new_event(EventType::SensorOffline, farm_id, 5))
        .await
        .unwrap();
    t.store.acknowledge(acked.id, "ops1", None).await.unwrap();

    let (status, body) = get(&t.app, "/api/v1/events/unacknowledged").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["id"], critical.id.to_string());
}

#[tokio::test]
async fn farm_and_equipment_listings() {
    let t = test_app();
    let farm_id = Uuid::new_v4();
    let stored = t
        .store
        .insert(new_event(EventType::BatteryLow, farm_id, 5))
        .await
        .unwrap();
    t.store
        .insert(new_event(EventType::BatteryLow, Uuid::new_v4(), 5))
        .await
        .unwrap();

    let (status, body) = get(&t.app, &format!("/api/v1/events/farm/{farm_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = get(
        &t.app,
        &format!("/api/v1/events/equipment/{}", stored.equipment_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["id"], stored.id.to_string());
}

// ---------------------------------------------------------------------------
// Single event
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_event_by_id() {
    let t = test_app();
    let stored = t
        .store
        .insert(new_event(EventType::BatteryLow, Uuid::new_v4(), 5))
        .await
        .unwrap();

    let (status, body) = get(&t.app, &format!("/api/v1/events/{}", stored.id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], stored.id.to_string());
    assert_eq!(body["data"]["eventType"], "BATTERY_LOW");
    assert_eq!(body["data"]["severity"], "CRITICAL");
    assert_eq!(body["data"]["equipmentType"], "SENSOR");
}

#[tokio::test]
async fn get_unknown_event_returns_404() {
    let t = test_app();
    let (status, body) = get(&t.app, &format!("/api/v1/events/{}", Uuid::now_v7())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_event_with_invalid_id_returns_400() {
    let t = test_app();
    let (status, _body) = get(&t.app, "/api/v1/events/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Acknowledge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn acknowledge_with_notes_marks_processed() {
    let t = test_app();
    let stored = t
        .store
        .insert(new_event(EventType::BatteryLow, Uuid::new_v4(), 5))
        .await
        .unwrap();

    let (status, body) = post_json(
        &t.app,
        &format!("/api/v1/events/{}/acknowledge", stored.id),
        json!({"acknowledgedBy": "ops1", "notes": "replaced"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["acknowledged"], true);
    assert_eq!(body["data"]["acknowledgedBy"], "ops1");
    assert!(body["data"]["acknowledgedAt"].is_string());
    assert_eq!(body["data"]["processed"], true);
    assert_eq!(body["data"]["processingNotes"], "replaced");
}

#[tokio::test]
async fn acknowledge_without_notes_leaves_unprocessed() {
    let t = test_app();
    let stored = t
        .store
        .insert(new_event(EventType::SensorOffline, Uuid::new_v4(), 5))
        .await
        .unwrap();

    let (status, body) = post_json(
        &t.app,
        &format!("/api/v1/events/{}/acknowledge", stored.id),
        json!({"acknowledgedBy": "ops2"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["acknowledged"], true);
    assert_eq!(body["data"]["processed"], false);
    assert_eq!(body["data"]["processingNotes"], Value::Null);
}

#[tokio::test]
async fn acknowledge_with_empty_actor_is_rejected_and_leaves_event_unchanged() {
    let t = test_app();
    let stored = t
        .store
        .insert(new_event(EventType::EquipmentFailure, Uuid::new_v4(), 5))
        .await
        .unwrap();

    for actor in ["", "   "] {
        let (status, body) = post_json(
            &t.app,
            &format!("/api/v1/events/{}/acknowledge", stored.id),
            json!({"acknowledgedBy": actor}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    let untouched = t.store.get(stored.id).await.unwrap().unwrap();
    assert!(!untouched.acknowledged);
    assert!(untouched.acknowledged_by.is_none());
}

#[tokio::test]
async fn acknowledge_unknown_event_returns_404() {
    let t = test_app();
    let (status, body) = post_json(
        &t.app,
        &format!("/api/v1/events/{}/acknowledge", Uuid::now_v7()),
        json!({"acknowledgedBy": "ops1"}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Dead letters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dead_letter_listing_exposes_failed_messages() {
    let t = test_app();
    let id = t.queue.enqueue(&json!({"broken": true})).await.unwrap();
    t.queue.claim("intake-0").await.unwrap();
    t.queue
        .dead_letter(id, "Missing required field: equipmentId")
        .await
        .unwrap();

    let (status, body) = get(&t.app, "/api/v1/events/dead-letters").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["reason"], "Missing required field: equipmentId");
    assert_eq!(body["data"][0]["payload"]["broken"], true);
}

// ---------------------------------------------------------------------------
// Escalations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn escalations_listing_returns_stale_critical_events() {
    let t = test_app();
    let farm_id = Uuid::new_v4();

    let stale = t
        .store
        .insert(new_event(EventType::SensorOffline, farm_id, 45))
        .await
        .unwrap();
    t.store
        .insert(new_event(EventType::SensorOffline, farm_id, 5))
        .await
        .unwrap();

    let (status, body) = get(&t.app, "/api/v1/alerts/escalations").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], stale.id.to_string());
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dashboard_statistics_shape_and_invariants() {
    let t = test_app();
    let farm_id = Uuid::new_v4();

    for event_type in [
        EventType::BatteryLow,
        EventType::StatusChanged,
        EventType::EquipmentCreated,
        EventType::SensorOffline,
    ] {
        t.store
            .insert(new_event(event_type, farm_id, 10))
            .await
            .unwrap();
    }

    let (status, body) = get(&t.app, "/api/v1/statistics/dashboard").await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["totalEvents"], 4);
    assert_eq!(data["unacknowledgedEvents"], 4);
    assert_eq!(data["criticalEvents"], 2);
    assert_eq!(data["warningEvents"], 1);
    assert_eq!(data["infoEvents"], 1);

    let by_severity = data["eventCountsBySeverity"].as_object().unwrap();
    let severity_sum: i64 = by_severity.values().map(|v| v.as_i64().unwrap()).sum();
    assert_eq!(data["totalEvents"].as_i64().unwrap(), severity_sum);

    assert_eq!(data["recentCriticalEvents"].as_array().unwrap().len(), 2);
    assert_eq!(data["recentEvents"].as_array().unwrap().len(), 4);

    let last_24h = data["eventsLast24Hours"].as_i64().unwrap();
    let last_7d = data["eventsLast7Days"].as_i64().unwrap();
    let last_30d = data["eventsLast30Days"].as_i64().unwrap();
    assert!(last_24h <= last_7d && last_7d <= last_30d);
    assert_eq!(last_24h, 4);
}
