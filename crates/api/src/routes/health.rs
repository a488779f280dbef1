//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub collaborators: CollaboratorHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    /// False when the app runs without a database.
    pub configured: bool,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Which collaborators talk to a real endpoint rather than the built-in mock.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CollaboratorHealth {
    pub catalog: bool,
    pub reports: bool,
    pub ai: bool,
    pub email: bool,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

async fn check_database(state: &AppState) -> DatabaseHealth {
    let Some(pool) = &state.pool else {
        return DatabaseHealth {
            configured: false,
            connected: false,
            latency_ms: None,
        };
    };

    let latency = persistence::db::ping(pool).await;
    DatabaseHealth {
        configured: true,
        connected: latency.is_some(),
        latency_ms: latency.map(|d| d.as_millis() as u64),
    }
}

impl DatabaseHealth {
    fn is_healthy(&self) -> bool {
        !self.configured || self.connected
    }
}

/// Full health check endpoint.
///
/// GET /api/health
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let database = check_database(&state).await;
    let config = &state.config;

    let response = HealthResponse {
        status: if database.is_healthy() { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collaborators: CollaboratorHealth {
            catalog: config.catalog.is_configured(),
            reports: config.reports.is_configured(),
            ai: config.ai.is_configured(),
            email: config.email.enabled,
        },
        database,
    };

    if response.database.is_healthy() {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    if check_database(&state).await.is_healthy() {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
