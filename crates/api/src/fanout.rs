//! Bus → WebSocket fan-out bridge.
//!
//! [`FanoutBridge`] subscribes to the event bus and pushes every persisted
//! event to the matching WebSocket streams. Delivery is fire-and-forget:
//! send failures, absent subscribers, and lag are logged and swallowed —
//! nothing here can reach back into the ingestion path. Subscribers that
//! were offline at publish time reconcile through the query API.

use std::sync::Arc;

use tokio::sync::broadcast;

use fieldwatch_core::event::EquipmentEvent;

use crate::ws::WsManager;

/// Routes persisted events from the bus to WebSocket subscribers.
pub struct FanoutBridge {
    ws_manager: Arc<WsManager>,
}

impl FanoutBridge {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the fan-out loop.
    ///
    /// Consumes events from the bus via `receiver`; exits when the channel
    /// is closed (i.e. the [`EventBus`](fieldwatch_events::EventBus) is
    /// dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<EquipmentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let delivered = self.ws_manager.broadcast_event(&event).await;
                    tracing::debug!(
                        event_id = %event.id,
                        delivered,
                        "Event fanned out to WebSocket subscribers"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Fan-out lagged, some events were not broadcast"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, fan-out bridge shutting down");
                    break;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use chrono::Utc;
    use fieldwatch_core::event::{EventSeverity, EventType};
    use fieldwatch_events::EventBus;
    use serde_json::json;

    use super::*;
    use crate::ws::StreamKind;

    fn sample_event() -> EquipmentEvent {
        let now = Utc::now();
        EquipmentEvent {
            id: uuid::Uuid::now_v7(),
            event_type: EventType::EquipmentFailure,
            equipment_id: uuid::Uuid::new_v4(),
            equipment_type: None,
            farm_id: uuid::Uuid::new_v4(),
            timestamp: now,
            payload: json!({}),
            message: None,
            severity: EventSeverity::Critical,
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
            received_at: now,
            processed: false,
            processing_notes: None,
        }
    }

    #[tokio::test]
    async fn bridge_pushes_bus_events_to_connections() {
        let bus = EventBus::default();
        let ws_manager = Arc::new(WsManager::new());
        let mut rx = ws_manager.add("global".into(), StreamKind::Global).await;

        let bridge = FanoutBridge::new(Arc::clone(&ws_manager));
        let handle = tokio::spawn(bridge.run(bus.subscribe()));

        let event = sample_event();
        bus.publish(event.clone());

        let msg = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("should receive within a second")
            .expect("channel open");
        let Message::Text(body) = msg else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["id"], event.id.to_string());

        drop(bus);
        handle.await.expect("bridge task should exit cleanly");
    }
}
