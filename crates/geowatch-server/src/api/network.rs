//! Visible network override.
//!
//! Only available when `[network] source = "static"`; with nmcli the names
//! come from NetworkManager and cannot be set.

use axum::extract::State;
use axum::routing::put;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the network router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", put(update_network))
}

/// Replacement set of visible network names.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "names": ["office-wifi"] }))]
pub struct NetworkNamesRequest {
    /// Names now visible. An empty list means no network.
    pub names: Vec<String>,
}

/// Visible network names after the update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NetworkNamesResponse {
    /// Names now visible, sorted.
    pub names: Vec<String>,
}

/// Replace the visible network names.
#[utoipa::path(
    put,
    path = "/api/network",
    tag = "network",
    operation_id = "updateNetwork",
    summary = "Replace visible network names",
    description = "Sets which network names exit confirmation sees. Requires the \
        static network source.",
    request_body = NetworkNamesRequest,
    responses(
        (status = 200, description = "Names replaced", body = NetworkNamesResponse),
        (status = 424, description = "Network source is not static", body = super::error::ErrorResponse)
    )
)]
pub async fn update_network(
    State(state): State<SharedState>,
    Json(request): Json<NetworkNamesRequest>,
) -> ApiResult<Json<NetworkNamesResponse>> {
    let Some(network) = state.network.as_ref() else {
        return Err(ApiError::FailedDependency {
            error_code: "NETWORK_SOURCE_NOT_STATIC".to_string(),
            message: "Visible networks can only be set with the static network source".to_string(),
            details: Some(format!("configured source: {:?}", state.config.network.source)),
        });
    };

    let mut names: Vec<String> = request
        .names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();

    network.set(names.iter().cloned());
    info!(networks = ?names, "visible networks replaced");

    Ok(Json(NetworkNamesResponse { names }))
}
