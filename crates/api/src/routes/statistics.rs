//! Route definitions for the `/statistics` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::statistics;
use crate::state::AppState;

/// Routes mounted at `/statistics`.
pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(statistics::dashboard))
}
