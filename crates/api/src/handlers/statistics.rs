//! Handlers for the `/statistics` resource.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use fieldwatch_db::store::DashboardStatistics;
use fieldwatch_events::StatisticsAggregator;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/statistics/dashboard
///
/// Full dashboard aggregate snapshot, re-derived from the store.
pub async fn dashboard(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardStatistics>>> {
    let aggregator = StatisticsAggregator::new(Arc::clone(&state.store));
    let statistics = aggregator.dashboard_statistics().await?;

    Ok(Json(DataResponse { data: statistics }))
}
