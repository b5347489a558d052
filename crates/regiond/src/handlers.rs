//! HTTP handlers for the region service.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rand::Rng;
use tracing::debug;

use crate::ServiceState;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct InfoResponse {
    pub status: String,
    pub version: String,
    pub region: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

/// GET /
pub async fn home(State(state): State<ServiceState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        status: "running".to_string(),
        version: state.version.clone(),
        region: state.region.clone(),
    })
}

/// GET /health
pub async fn health(State(state): State<ServiceState>) -> impl IntoResponse {
    let failed = rand::rng().random_bool(state.failure_rate);

    if failed {
        debug!(region = %state.region, "simulated health failure");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                version: state.version.clone(),
                region: state.region.clone(),
                reason: Some("simulated failure".to_string()),
            }),
        )
    } else {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                version: state.version.clone(),
                region: state.region.clone(),
                reason: None,
            }),
        )
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<ServiceState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        crate::metrics::render_prometheus(&state),
    )
}
