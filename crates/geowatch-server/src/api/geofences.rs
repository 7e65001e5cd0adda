//! Geofence management API endpoints.
//!
//! Saved geofences are the candidates the scheduler allocates monitoring
//! slots to. Creating one while a location is known may start monitoring it
//! straight away; deleting one stops monitoring it and frees its slot.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use geowatch_core::{Coordinate, Geofence, GeofenceParams};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the geofences router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_geofences).post(create_geofence))
        .route("/{name}", delete(delete_geofence))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a geofence.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "location_name": "office",
    "latitude": 3.1390,
    "longitude": 101.6869,
    "radius_m": 200.0,
    "trusted_network": "office-wifi"
}))]
pub struct CreateGeofenceRequest {
    /// Unique name, 1-64 characters without control characters.
    #[schema(example = "office", min_length = 1, max_length = 64)]
    pub location_name: String,

    /// Center latitude in degrees.
    #[schema(example = 3.1390, minimum = -90.0, maximum = 90.0)]
    pub latitude: f64,

    /// Center longitude in degrees.
    #[schema(example = 101.6869, minimum = -180.0, maximum = 180.0)]
    pub longitude: f64,

    /// Radius in meters. Defaults to the configured default radius.
    #[schema(example = 200.0)]
    pub radius_m: Option<f64>,

    /// Network whose visibility defers exits from this geofence.
    #[schema(example = "office-wifi")]
    pub trusted_network: Option<String>,
}

/// All saved geofences.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeofenceListResponse {
    /// Geofences in working-list order.
    pub geofences: Vec<Geofence>,

    /// Number of geofences.
    #[schema(example = 1)]
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List saved geofences.
#[utoipa::path(
    get,
    path = "/api/geofences",
    tag = "geofences",
    operation_id = "listGeofences",
    summary = "List saved geofences",
    responses(
        (status = 200, description = "Geofences retrieved", body = GeofenceListResponse),
        (status = 503, description = "Scheduler not running", body = super::error::ErrorResponse)
    )
)]
pub async fn list_geofences(
    State(state): State<SharedState>,
) -> ApiResult<Json<GeofenceListResponse>> {
    let geofences = state.scheduler.snapshot().await?.geofences;
    Ok(Json(GeofenceListResponse {
        count: geofences.len(),
        geofences,
    }))
}

/// Create a geofence.
#[utoipa::path(
    post,
    path = "/api/geofences",
    tag = "geofences",
    operation_id = "createGeofence",
    summary = "Create a geofence",
    description = "Persists a new geofence. If the user's location is known, \
        monitoring slots are reallocated immediately.",
    request_body = CreateGeofenceRequest,
    responses(
        (status = 201, description = "Geofence created", body = Geofence),
        (status = 400, description = "Invalid name, coordinate or radius", body = super::error::ErrorResponse),
        (status = 409, description = "Location name already used", body = super::error::ErrorResponse),
        (status = 500, description = "Store failure", body = super::error::ErrorResponse)
    )
)]
pub async fn create_geofence(
    State(state): State<SharedState>,
    Json(request): Json<CreateGeofenceRequest>,
) -> ApiResult<(StatusCode, Json<Geofence>)> {
    let radius_m = request
        .radius_m
        .unwrap_or(state.config.geofences.default_radius_m);
    let params = GeofenceParams {
        location_name: request.location_name,
        coordinate: Coordinate::new(request.latitude, request.longitude),
        radius_m,
        trusted_network: request.trusted_network,
    };

    let geofence = state.scheduler.save(params).await?;
    Ok((StatusCode::CREATED, Json(geofence)))
}

/// Delete a geofence.
#[utoipa::path(
    delete,
    path = "/api/geofences/{name}",
    tag = "geofences",
    operation_id = "deleteGeofence",
    summary = "Delete a geofence",
    description = "Removes the geofence from the store, stops monitoring its \
        region and cancels any deferred exit for it.",
    params(("name" = String, Path, description = "Location name of the geofence")),
    responses(
        (status = 200, description = "Geofence deleted", body = Geofence),
        (status = 404, description = "Unknown geofence", body = super::error::ErrorResponse),
        (status = 500, description = "Store failure", body = super::error::ErrorResponse)
    )
)]
pub async fn delete_geofence(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Geofence>> {
    Ok(Json(state.scheduler.remove(name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_optional_fields() {
        let json = r#"{"location_name": "home", "latitude": 1.5, "longitude": 2.5}"#;
        let request: CreateGeofenceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.location_name, "home");
        assert!(request.radius_m.is_none());
        assert!(request.trusted_network.is_none());
    }
}
