//! OpenAPI specification generation for the geowatch API.
//!
//! Served at `/api/openapi.json`, rendered by Swagger UI at `/swagger-ui`,
//! and written to disk by the `gen-openapi` binary.

use axum::Json;
use geowatch_core::{
    CircularRegion, Coordinate, GeoState, Geofence, PresentationEvent, RegionState,
    SchedulerSnapshot,
};
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::geofences::{CreateGeofenceRequest, GeofenceListResponse};
use super::health::HealthResponse;
use super::location::{LocationUpdateRequest, LocationUpdateResponse};
use super::network::{NetworkNamesRequest, NetworkNamesResponse};
use super::regions::{MonitoredRegionsResponse, RegionEventResponse, RegionStateRequest};
use super::status::StatusResponse;

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for geowatch.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "geowatch API",
        version = "0.1.0",
        description = r#"
# geowatch API

geowatch keeps a bounded set of geofence regions monitored around the user and
reports confirmed entries and exits.

## Overview

1. **Geofences**: Saved circular areas, each optionally tied to a trusted network
2. **Location**: Each update re-ranks geofences by distance; only the closest
   ones (up to the configured capacity) are monitored
3. **Region events**: Entries are confirmed at once. Exits are deferred while the
   geofence's trusted network is still visible, and re-checked periodically
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local geowatch server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "geofences", description = "Saved geofence management"),
        (name = "location", description = "Location updates that drive region allocation"),
        (name = "regions", description = "Monitored regions and region events"),
        (name = "status", description = "Scheduler state and recent notifications"),
        (name = "network", description = "Visible network names for exit confirmation")
    ),
    paths(
        super::health::health_check,
        super::geofences::list_geofences,
        super::geofences::create_geofence,
        super::geofences::delete_geofence,
        super::location::update_location,
        super::regions::list_monitored,
        super::regions::region_entered,
        super::regions::region_exited,
        super::regions::region_state,
        super::status::get_status,
        super::network::update_network,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            Coordinate,
            CircularRegion,
            Geofence,
            GeoState,
            RegionState,
            PresentationEvent,
            SchedulerSnapshot,
            CreateGeofenceRequest,
            GeofenceListResponse,
            LocationUpdateRequest,
            LocationUpdateResponse,
            MonitoredRegionsResponse,
            RegionStateRequest,
            RegionEventResponse,
            StatusResponse,
            NetworkNamesRequest,
            NetworkNamesResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "geowatch API");
        assert!(spec.paths.paths.contains_key("/api/geofences/{name}"));
        assert!(spec.paths.paths.contains_key("/api/regions/{name}/exit"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"geowatch API\""));
    }
}
