//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::api::types::Json;
use serde::Serialize;

use super::state::AppState;
use crate::domain::dispatch::NOT_CONNECTED_REASON;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Simple health check - returns 200 if the service is running
/// Used for basic liveness probes
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check with dependency verification
///
/// An unreachable credential store makes the service unhealthy; a missing or
/// disconnected transport session only degrades it, since key endpoints still work.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let store_check = check_credential_store(&state).await;
    let transport_check = check_transport_session(&state).await;

    let overall_status = if store_check.status == HealthStatus::Unhealthy {
        HealthStatus::Unhealthy
    } else if transport_check.status != HealthStatus::Healthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let latency = start.elapsed().as_millis() as u64;
    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![store_check, transport_check]),
        latency_ms: Some(latency),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Still accept requests
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check - simple check to verify the service is running
/// Used for Kubernetes liveness probes to detect crashes
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

impl HealthCheck {
    fn timed(name: &str, status: HealthStatus, message: Option<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        }
    }
}

async fn check_credential_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    match state.api_key_service.count().await {
        Ok(_) => HealthCheck::timed("credential_store", HealthStatus::Healthy, None, start),
        Err(e) => HealthCheck::timed(
            "credential_store",
            HealthStatus::Unhealthy,
            Some(e.to_string()),
            start,
        ),
    }
}

async fn check_transport_session(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    if state.dispatch_engine.sessions().is_connected().await {
        HealthCheck::timed("transport_session", HealthStatus::Healthy, None, start)
    } else {
        HealthCheck::timed(
            "transport_session",
            HealthStatus::Degraded,
            Some(NOT_CONNECTED_REASON.to_string()),
            start,
        )
    }
}
