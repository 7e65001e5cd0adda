//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `geofences` - Saved geofence management
//! - `location` - Location updates driving slot allocation
//! - `regions` - Region enter/exit/state events and monitored regions
//! - `status` - Scheduler snapshot and recent notifications
//! - `network` - Visible network override (static source)
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod error;
pub mod geofences;
pub mod health;
pub mod location;
pub mod network;
pub mod openapi;
pub mod regions;
pub mod status;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                     - Health check
/// /swagger-ui                 - Interactive API docs
/// /api
/// ├── /geofences              - List, create, delete geofences
/// ├── /location               - Location updates
/// ├── /regions                - Monitored regions and region events
/// ├── /status                 - Scheduler status
/// ├── /network                - Visible network override
/// └── /openapi.json           - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/geofences", geofences::router())
                .nest("/location", location::router())
                .nest("/regions", regions::router())
                .nest("/status", status::router())
                .nest("/network", network::router()),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use geowatch_core::{
        Config, Coordinate, Geofence, GeofenceParams, JsonFileStore, MemoryStore, NetworkSource,
        SchedulerHandle,
    };
    use serde_json::json;

    use super::*;
    use crate::state::AppState;

    struct TestApp {
        server: TestServer,
        handle: SchedulerHandle,
    }

    fn app_with(config: Config, stored: Vec<Geofence>) -> TestApp {
        let store = Box::new(MemoryStore::with_geofences(stored));
        let (scheduler, state) = AppState::build(config, store).unwrap();
        let handle = scheduler.handle();
        tokio::spawn(scheduler.run());
        TestApp {
            server: TestServer::new(create_router(state)).unwrap(),
            handle,
        }
    }

    fn static_config(capacity: usize) -> Config {
        let mut config = Config::default();
        config.monitoring.capacity = capacity;
        config.network.source = NetworkSource::Static;
        config
    }

    fn geofence(name: &str, latitude: f64, longitude: f64, wifi: Option<&str>) -> Geofence {
        let mut params = GeofenceParams::new(name, Coordinate::new(latitude, longitude), 300.0);
        params.trusted_network = wifi.map(str::to_string);
        Geofence::from_params(params)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(static_config(10), Vec::new());
        let response = app.server.get("/health").await;
        response.assert_status_ok();
        let body: health::HealthResponse = response.json();
        assert_eq!(body.status, "ok");
        assert!(body.scheduler_running);

        app.handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let body: health::HealthResponse = app.server.get("/health").await.json();
        assert_eq!(body.status, "degraded");
    }

    #[tokio::test]
    async fn test_create_list_delete_geofence() {
        let app = app_with(static_config(10), Vec::new());

        let response = app
            .server
            .post("/api/geofences")
            .json(&json!({ "location_name": "office", "latitude": 3.139, "longitude": 101.6869 }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Geofence = response.json();
        assert_eq!(created.radius_m, 500.0);

        let duplicate = app
            .server
            .post("/api/geofences")
            .json(&json!({ "location_name": "office", "latitude": 1.0, "longitude": 1.0 }))
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);

        let list: geofences::GeofenceListResponse = app.server.get("/api/geofences").await.json();
        assert_eq!(list.count, 1);

        app.server
            .delete("/api/geofences/office")
            .await
            .assert_status_ok();
        app.server
            .delete("/api/geofences/office")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_invalid_geofence_is_rejected() {
        let app = app_with(static_config(10), Vec::new());
        let response = app
            .server
            .post("/api/geofences")
            .json(&json!({ "location_name": "", "latitude": 1.0, "longitude": 1.0 }))
            .await;
        response.assert_status_bad_request();
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "INVALID_GEOFENCE");
    }

    #[tokio::test]
    async fn test_location_update_allocates_closest() {
        let app = app_with(
            static_config(1),
            vec![
                geofence("first", 37.330_336_74, -122.022_525_93, None),
                geofence("second", 37.326_022_76, -122.032_158_08, None),
            ],
        );

        app.server
            .post("/api/location")
            .json(&json!({ "latitude": 37.335_258_15, "longitude": -122.032_546_39 }))
            .await
            .assert_status(StatusCode::ACCEPTED);

        let regions: regions::MonitoredRegionsResponse = app.server.get("/api/regions").await.json();
        assert_eq!(regions.capacity, 1);
        assert_eq!(regions.regions.len(), 1);
        assert_eq!(regions.regions[0].identifier, "second");
    }

    #[tokio::test]
    async fn test_out_of_range_location_is_rejected() {
        let app = app_with(static_config(10), Vec::new());
        app.server
            .post("/api/location")
            .json(&json!({ "latitude": 91.0, "longitude": 0.0 }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_exit_confirmation_follows_network() {
        let app = app_with(
            static_config(10),
            vec![geofence("setel - 45", -1.0, -1.0, Some("setel45"))],
        );

        app.server
            .put("/api/network")
            .json(&json!({ "names": ["setel45"] }))
            .await
            .assert_status_ok();
        app.server
            .post("/api/regions/setel%20-%2045/exit")
            .await
            .assert_status(StatusCode::ACCEPTED);

        let status: status::StatusResponse = app.server.get("/api/status").await.json();
        assert!(status.states.is_empty());
        assert_eq!(status.scheduler.pending_rechecks, vec!["setel - 45".to_string()]);

        app.server
            .post("/api/regions/setel%20-%2045/enter")
            .await
            .assert_status(StatusCode::ACCEPTED);
        let status: status::StatusResponse = app.server.get("/api/status").await.json();
        assert!(status.scheduler.pending_rechecks.is_empty());
        assert_eq!(status.states.len(), 1);
        assert_eq!(status.states[0].readable_status(), "INSIDE setel - 45");

        app.server
            .put("/api/network")
            .json(&json!({ "names": [] }))
            .await
            .assert_status_ok();
        app.server
            .post("/api/regions/setel%20-%2045/state")
            .json(&json!({ "state": "outside" }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        let status: status::StatusResponse = app.server.get("/api/status").await.json();
        assert_eq!(status.states[0].readable_status(), "OUTSIDE setel - 45");
    }

    #[tokio::test]
    async fn test_region_event_for_unknown_geofence() {
        let app = app_with(static_config(10), Vec::new());
        app.server
            .post("/api/regions/nowhere/enter")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_network_update_requires_static_source() {
        let app = app_with(Config::default(), Vec::new());
        app.server
            .put("/api/network")
            .json(&json!({ "names": ["home"] }))
            .await
            .assert_status(StatusCode::FAILED_DEPENDENCY);
    }

    #[tokio::test]
    async fn test_geofences_persist_to_json_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Box::new(JsonFileStore::new(dir.path()));
        let (scheduler, state) = AppState::build(static_config(10), store).unwrap();
        tokio::spawn(scheduler.run());
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post("/api/geofences")
            .json(&json!({ "location_name": "home", "latitude": 1.0, "longitude": 1.0, "radius_m": 80.0 }))
            .await
            .assert_status(StatusCode::CREATED);

        let reloaded = geowatch_core::GeofenceStore::list_all(&JsonFileStore::new(dir.path())).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].radius_m, 80.0);
    }

    #[tokio::test]
    async fn test_openapi_endpoint() {
        let app = app_with(static_config(10), Vec::new());
        let response = app.server.get("/api/openapi.json").await;
        response.assert_status_ok();
        assert!(response.text().contains("geowatch API"));
    }
}
