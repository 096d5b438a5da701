//! Route definitions for the `/events` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// GET  /                          -> list_events
/// GET  /unacknowledged            -> unacknowledged_critical
/// GET  /dead-letters              -> list_dead_letters
/// GET  /farm/{farm_id}            -> events_by_farm
/// GET  /equipment/{equipment_id}  -> events_by_equipment
/// GET  /{id}                      -> get_event
/// POST /{id}/acknowledge          -> acknowledge_event
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events))
        .route("/unacknowledged", get(events::unacknowledged_critical))
        .route("/dead-letters", get(events::list_dead_letters))
        .route("/farm/{farm_id}", get(events::events_by_farm))
        .route("/equipment/{equipment_id}", get(events::events_by_equipment))
        .route("/{id}", get(events::get_event))
        .route("/{id}/acknowledge", post(events::acknowledge_event))
}
