//! Region event endpoints.
//!
//! These feed the scheduler the events a location platform would deliver
//! for a monitored region: entry, exit and state determination. The region
//! is derived from the named geofence.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use geowatch_core::{CircularRegion, GeowatchError, RegionState};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::{AppState, SharedState};

/// Creates the regions router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_monitored))
        .route("/{name}/enter", post(region_entered))
        .route("/{name}/exit", post(region_exited))
        .route("/{name}/state", post(region_state))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Regions the platform currently monitors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonitoredRegionsResponse {
    /// Monitored regions in platform order.
    pub regions: Vec<CircularRegion>,

    /// Configured capacity.
    #[schema(example = 10)]
    pub capacity: usize,
}

/// Request body for a state-determination event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "state": "inside" }))]
pub struct RegionStateRequest {
    /// Determined state.
    pub state: RegionState,
}

/// Acknowledgement of a queued region event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionEventResponse {
    /// Always true; confirmation happens asynchronously.
    #[schema(example = true)]
    pub accepted: bool,

    /// Region the event was posted for.
    pub region: CircularRegion,
}

// ============================================================================
// Handlers
// ============================================================================

/// List monitored regions.
#[utoipa::path(
    get,
    path = "/api/regions",
    tag = "regions",
    operation_id = "listMonitoredRegions",
    summary = "List monitored regions",
    responses(
        (status = 200, description = "Monitored regions", body = MonitoredRegionsResponse),
        (status = 503, description = "Scheduler not running", body = super::error::ErrorResponse)
    )
)]
pub async fn list_monitored(
    State(state): State<SharedState>,
) -> ApiResult<Json<MonitoredRegionsResponse>> {
    let snapshot = state.scheduler.snapshot().await?;
    Ok(Json(MonitoredRegionsResponse {
        regions: snapshot.monitored,
        capacity: snapshot.capacity,
    }))
}

/// Report entering a region.
#[utoipa::path(
    post,
    path = "/api/regions/{name}/enter",
    tag = "regions",
    operation_id = "regionEntered",
    summary = "Report entering a region",
    description = "Entries are confirmed immediately and cancel any deferred exit.",
    params(("name" = String, Path, description = "Location name of the geofence")),
    responses(
        (status = 202, description = "Event queued", body = RegionEventResponse),
        (status = 404, description = "Unknown geofence", body = super::error::ErrorResponse)
    )
)]
pub async fn region_entered(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<(StatusCode, Json<RegionEventResponse>)> {
    let region = region_for(&state, &name).await?;
    state.scheduler.region_entered(region.clone()).await?;
    Ok(accepted(region))
}

/// Report leaving a region.
#[utoipa::path(
    post,
    path = "/api/regions/{name}/exit",
    tag = "regions",
    operation_id = "regionExited",
    summary = "Report leaving a region",
    description = "If the geofence's trusted network is still visible the exit is \
        deferred and re-checked later; otherwise it is confirmed immediately.",
    params(("name" = String, Path, description = "Location name of the geofence")),
    responses(
        (status = 202, description = "Event queued", body = RegionEventResponse),
        (status = 404, description = "Unknown geofence", body = super::error::ErrorResponse)
    )
)]
pub async fn region_exited(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<(StatusCode, Json<RegionEventResponse>)> {
    let region = region_for(&state, &name).await?;
    state.scheduler.region_exited(region.clone()).await?;
    Ok(accepted(region))
}

/// Report a determined region state.
#[utoipa::path(
    post,
    path = "/api/regions/{name}/state",
    tag = "regions",
    operation_id = "regionStateDetermined",
    summary = "Report a determined region state",
    description = "`inside` is handled as an entry, `outside` as an exit, \
        `unknown` is ignored.",
    params(("name" = String, Path, description = "Location name of the geofence")),
    request_body = RegionStateRequest,
    responses(
        (status = 202, description = "Event queued", body = RegionEventResponse),
        (status = 404, description = "Unknown geofence", body = super::error::ErrorResponse)
    )
)]
pub async fn region_state(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(request): Json<RegionStateRequest>,
) -> ApiResult<(StatusCode, Json<RegionEventResponse>)> {
    let region = region_for(&state, &name).await?;
    state
        .scheduler
        .region_state_determined(region.clone(), request.state)
        .await?;
    Ok(accepted(region))
}

// ============================================================================
// Helpers
// ============================================================================

async fn region_for(state: &AppState, name: &str) -> Result<CircularRegion, GeowatchError> {
    state
        .scheduler
        .snapshot()
        .await?
        .geofences
        .iter()
        .find(|g| g.location_name == name)
        .map(geowatch_core::Geofence::to_region)
        .ok_or_else(|| GeowatchError::GeofenceNotFound(name.to_string()))
}

fn accepted(region: CircularRegion) -> (StatusCode, Json<RegionEventResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(RegionEventResponse {
            accepted: true,
            region,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_request_deserialization() {
        let request: RegionStateRequest = serde_json::from_str(r#"{"state":"outside"}"#).unwrap();
        assert_eq!(request.state, RegionState::Outside);
    }
}
