use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use fieldwatch_core::event::EquipmentEvent;
use fieldwatch_core::types::{EntityId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Which logical event stream a connection subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Every persisted event.
    Global,
    /// Events for one farm.
    Farm(EntityId),
    /// CRITICAL events only.
    CriticalAlerts,
}

impl StreamKind {
    /// Whether an event belongs on this stream.
    fn wants(&self, event: &EquipmentEvent) -> bool {
        match self {
            StreamKind::Global => true,
            StreamKind::Farm(farm_id) => event.farm_id == *farm_id,
            StreamKind::CriticalAlerts => event.severity.is_critical(),
        }
    }
}

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// The stream this connection subscribed to.
    pub stream: StreamKind,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection on a stream.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        stream: StreamKind,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            stream,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Push a persisted event to every subscribed connection.
    ///
    /// Fire-and-forget: connections whose send channels are closed are
    /// silently skipped (they are cleaned up by their own receive loop),
    /// and the event JSON is the same shape the query API serves.
    pub async fn broadcast_event(&self, event: &EquipmentEvent) -> usize {
        let body = match serde_json::to_string(event) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "Failed to serialize event");
                return 0;
            }
        };

        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values() {
            if conn.stream.wants(event) {
                let _ = conn.sender.send(Message::Text(body.clone().into()));
                delivered += 1;
            }
        }
        delivered
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
