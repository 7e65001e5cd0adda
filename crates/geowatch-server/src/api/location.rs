//! Location update endpoint.
//!
//! Every update triggers an allocation pass: the closest geofences (up to the
//! configured capacity) get monitored and the furthest ones are evicted.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use geowatch_core::Coordinate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the location router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(update_location))
}

/// Request body for a location update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({ "latitude": 3.1390, "longitude": 101.6869 }))]
pub struct LocationUpdateRequest {
    /// Latitude in degrees.
    #[schema(example = 3.1390, minimum = -90.0, maximum = 90.0)]
    pub latitude: f64,

    /// Longitude in degrees.
    #[schema(example = 101.6869, minimum = -180.0, maximum = 180.0)]
    pub longitude: f64,
}

/// Acknowledgement of a queued location update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationUpdateResponse {
    /// Always true; the allocation pass runs asynchronously.
    #[schema(example = true)]
    pub accepted: bool,

    /// The location that was queued.
    pub location: Coordinate,
}

/// Report the user's current location.
#[utoipa::path(
    post,
    path = "/api/location",
    tag = "location",
    operation_id = "updateLocation",
    summary = "Report the user's location",
    description = "Queues a location update. The scheduler re-ranks saved geofences \
        by distance and adjusts which regions are monitored.",
    request_body = LocationUpdateRequest,
    responses(
        (status = 202, description = "Update queued", body = LocationUpdateResponse),
        (status = 400, description = "Coordinate out of range", body = super::error::ErrorResponse),
        (status = 503, description = "Scheduler not running", body = super::error::ErrorResponse)
    )
)]
pub async fn update_location(
    State(state): State<SharedState>,
    Json(request): Json<LocationUpdateRequest>,
) -> ApiResult<(StatusCode, Json<LocationUpdateResponse>)> {
    let location = Coordinate::new(request.latitude, request.longitude);
    location
        .validate()
        .map_err(|e| ApiError::bad_request("INVALID_COORDINATE", e.to_string()))?;

    state.scheduler.location_updated(location).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(LocationUpdateResponse {
            accepted: true,
            location,
        }),
    ))
}
