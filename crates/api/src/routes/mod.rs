pub mod alerts;
pub mod events;
pub mod health;
pub mod statistics;

use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /events                          list (filtered, paginated)
/// /events/unacknowledged           unacknowledged CRITICAL events
/// /events/dead-letters             dead-lettered messages
/// /events/farm/{farm_id}           events for one farm
/// /events/equipment/{equipment_id} events for one equipment
/// /events/{id}                     single event
/// /events/{id}/acknowledge         acknowledge (POST)
///
/// /alerts/escalations              events needing escalation
///
/// /statistics/dashboard            aggregate snapshot
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/events", events::router())
        .nest("/alerts", alerts::router())
        .nest("/statistics", statistics::router())
}

/// Build the full application router: health at root, the API under
/// `/api/v1`, and the WebSocket streams under `/ws`.
///
/// Middleware is layered on top of this in `main` so tests can drive the
/// bare router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(ws::router())
        .nest("/api/v1", api_routes())
        .with_state(state)
}
