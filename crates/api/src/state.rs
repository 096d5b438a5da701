use std::sync::Arc;

use fieldwatch_db::store::{EventStore, IngestQueue};
use fieldwatch_events::EventBus;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The store and
/// queue are trait objects so integration tests can run the whole router
/// against the in-memory backends.
#[derive(Clone)]
pub struct AppState {
    /// Durable event store.
    pub store: Arc<dyn EventStore>,
    /// Ingest queue (dead-letter inspection).
    pub queue: Arc<dyn IngestQueue>,
    /// Centralized event bus carrying persisted events.
    pub bus: Arc<EventBus>,
    /// WebSocket connection manager (dashboard clients).
    pub ws_manager: Arc<WsManager>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
