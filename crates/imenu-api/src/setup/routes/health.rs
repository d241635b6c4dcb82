//! Health check handlers and response types.

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json};
use imenu_core::DeliveryType;
use imenu_infra::MemoryUsage;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HealthCheckResponse {
    pub status: &'static str,
    pub backend: String,
    pub cloudinary_configured: bool,
    pub storage_configured: bool,
    pub storage: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
    pub environment: String,
}

/// Liveness probe - process is running.
pub async fn liveness_check(_state: Arc<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Health report. Always 200 while the process serves requests; the body
/// tells whether uploads can actually succeed.
pub async fn health_check(state: Arc<AppState>) -> impl IntoResponse {
    let storage_configured = state.storage.is_configured();

    // The remote host is never called from here; only the local disk is probed.
    let storage = match state.storage.as_local() {
        Some(local) => {
            run_check(
                TIMEOUT,
                async move {
                    local
                        .exists(DeliveryType::Upload, "health-check-non-existent-key")
                        .await
                        .map(drop)
                },
                "degraded",
            )
            .await
        }
        None if storage_configured => "configured".to_string(),
        None => "not_configured".to_string(),
    };

    let memory = match &state.process {
        Some(monitor) => match tokio::time::timeout(TIMEOUT, monitor.memory_usage_async()).await {
            Ok(Ok(usage)) => Some(usage),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read process memory");
                None
            }
            Err(_) => {
                tracing::warn!("Reading process memory timed out");
                None
            }
        },
        None => None,
    };

    let response = HealthCheckResponse {
        status: "online",
        backend: state.storage.backend_type().to_string(),
        cloudinary_configured: state.config.cloudinary_configured(),
        storage_configured,
        storage,
        uptime_seconds: state.uptime_secs(),
        memory,
        environment: state.config.environment().to_string(),
    };

    (StatusCode::OK, Json(response))
}
