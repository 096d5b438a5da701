//! Handlers for the `/alerts` resource.

use axum::extract::{Query, State};
use axum::Json;

use fieldwatch_core::event::EquipmentEvent;
use fieldwatch_events::alerts::AlertEngine;

use crate::error::AppResult;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/alerts/escalations
///
/// List unacknowledged critical events that currently satisfy the
/// escalation predicate. Evaluated at request time — there is no internal
/// escalation scheduler; callers poll this endpoint.
pub async fn pending_escalations(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<EquipmentEvent>>>> {
    let escalations =
        AlertEngine::pending_escalations(state.store.as_ref(), params.to_page()).await?;

    Ok(Json(DataResponse { data: escalations }))
}
