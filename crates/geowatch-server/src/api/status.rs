//! Scheduler status endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use geowatch_core::{GeoState, PresentationEvent, SchedulerSnapshot};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the status router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_status))
}

/// Scheduler state plus recent notifications.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Working list, monitored regions and pending re-checks.
    pub scheduler: SchedulerSnapshot,

    /// Latest confirmed state per region.
    pub states: Vec<GeoState>,

    /// Recent notifications, oldest first.
    pub recent_events: Vec<PresentationEvent>,
}

/// Get scheduler status.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "status",
    operation_id = "getStatus",
    summary = "Get scheduler status",
    description = "Returns the scheduler snapshot, the latest confirmed inside/outside \
        state of each region and the most recent notifications.",
    responses(
        (status = 200, description = "Status retrieved", body = StatusResponse),
        (status = 503, description = "Scheduler not running", body = super::error::ErrorResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> ApiResult<Json<StatusResponse>> {
    let scheduler = state.scheduler.snapshot().await?;
    Ok(Json(StatusResponse {
        scheduler,
        states: state.status.latest_states(),
        recent_events: state.status.recent_events(),
    }))
}
