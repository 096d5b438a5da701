//! WebSocket infrastructure for real-time fan-out.
//!
//! Provides connection management keyed by logical stream (global,
//! per-farm, critical-only), heartbeat monitoring, and the HTTP upgrade
//! handlers used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub use heartbeat::start_heartbeat;
pub use manager::{StreamKind, WsManager};

/// Routes for the real-time streams (mounted at root level, not `/api/v1`).
///
/// ```text
/// GET /ws/events                 -> global event stream
/// GET /ws/events/farm/{farm_id}  -> per-farm event stream
/// GET /ws/alerts                 -> critical-alerts-only stream
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws/events", get(handler::ws_events))
        .route("/ws/events/farm/{farm_id}", get(handler::ws_farm_events))
        .route("/ws/alerts", get(handler::ws_alerts))
}
