//! Handlers for the `/events` resource.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use fieldwatch_core::error::CoreError;
use fieldwatch_core::event::{EquipmentEvent, EventFilter, EventSeverity, EventType};
use fieldwatch_core::types::{EntityId, EventId, Timestamp};
use fieldwatch_db::store::DeadLetter;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /events`.
///
/// Filter criteria combine with AND; all are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListQuery {
    pub farm_id: Option<EntityId>,
    pub equipment_id: Option<EntityId>,
    pub event_type: Option<EventType>,
    pub severity: Option<EventSeverity>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub acknowledged: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl EventListQuery {
    fn filter(&self) -> EventFilter {
        EventFilter {
            farm_id: self.farm_id,
            equipment_id: self.equipment_id,
            event_type: self.event_type,
            severity: self.severity,
            start_date: self.start_date,
            end_date: self.end_date,
            acknowledged: self.acknowledged,
        }
    }

    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Request body for `POST /events/{id}/acknowledge`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeEventRequest {
    /// Who is acknowledging. Must be non-empty.
    #[validate(length(min = 1, message = "acknowledgedBy must not be empty"))]
    pub acknowledged_by: String,
    /// Optional processing notes; non-empty notes mark the event processed.
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// GET /api/v1/events
///
/// List events with optional filtering, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> AppResult<Json<PageResponse<EquipmentEvent>>> {
    let page = params.pagination().to_page();
    let result = state.store.list(&params.filter(), page).await?;

    Ok(Json(PageResponse {
        data: result.items,
        total: result.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// GET /api/v1/events/unacknowledged
///
/// List unacknowledged CRITICAL events, newest first.
pub async fn unacknowledged_critical(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<EquipmentEvent>>> {
    let page = params.to_page();
    let result = state.store.list_unacknowledged_critical(page).await?;

    Ok(Json(PageResponse {
        data: result.items,
        total: result.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// GET /api/v1/events/farm/{farm_id}
pub async fn events_by_farm(
    State(state): State<AppState>,
    Path(farm_id): Path<EntityId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<EquipmentEvent>>> {
    let page = params.to_page();
    let filter = EventFilter {
        farm_id: Some(farm_id),
        ..Default::default()
    };
    let result = state.store.list(&filter, page).await?;

    Ok(Json(PageResponse {
        data: result.items,
        total: result.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// GET /api/v1/events/equipment/{equipment_id}
pub async fn events_by_equipment(
    State(state): State<AppState>,
    Path(equipment_id): Path<EntityId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<EquipmentEvent>>> {
    let page = params.to_page();
    let filter = EventFilter {
        equipment_id: Some(equipment_id),
        ..Default::default()
    };
    let result = state.store.list(&filter, page).await?;

    Ok(Json(PageResponse {
        data: result.items,
        total: result.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// GET /api/v1/events/dead-letters
///
/// Inspect messages that were routed to the dead-letter destination.
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<DeadLetter>>> {
    let page = params.to_page();
    let result = state.queue.list_dead_letters(page).await?;

    Ok(Json(PageResponse {
        data: result.items,
        total: result.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

// ---------------------------------------------------------------------------
// Single event
// ---------------------------------------------------------------------------

/// GET /api/v1/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> AppResult<Json<DataResponse<EquipmentEvent>>> {
    let event = state
        .store
        .get(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Event", id })?;

    Ok(Json(DataResponse { data: event }))
}

/// POST /api/v1/events/{id}/acknowledge
///
/// Mark an event as acknowledged. Non-empty notes additionally mark it
/// processed. Returns the updated event.
pub async fn acknowledge_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(request): Json<AcknowledgeEventRequest>,
) -> AppResult<Json<DataResponse<EquipmentEvent>>> {
    request
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let acknowledged_by = request.acknowledged_by.trim();
    if acknowledged_by.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "acknowledgedBy must not be empty".to_string(),
        )));
    }

    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    tracing::info!(event_id = %id, acknowledged_by, "Acknowledging event");

    let event = state
        .store
        .acknowledge(id, acknowledged_by, notes)
        .await?
        .ok_or(CoreError::NotFound { entity: "Event", id })?;

    Ok(Json(DataResponse { data: event }))
}
