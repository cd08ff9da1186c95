//! Health check handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::api::state::AppState;
use crate::domain::ApiResponse;
use crate::error::ErrorCode;

/// Liveness check: always returns 200 if the service is running.
pub async fn health() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Readiness check: reports whether the storage backend answers.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let storage_ok = match state.storage.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.storage.backend_name(), "Storage not ready");
            false
        }
    };

    let status_code = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = Json(json!({
        "code": if storage_ok { 0 } else { ErrorCode::SERVICE_UNAVAILABLE.as_i32() },
        "message": if storage_ok { "success" } else { "service unavailable" },
        "data": {
            "ready": storage_ok,
            "components": {
                "storage": state.storage.backend_name()
            }
        }
    }));

    (status_code, response)
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.as_ref().map_or_else(
        || {
            let mut output = String::new();
            output.push_str("# HELP maquinas_up Whether the service is up\n");
            output.push_str("# TYPE maquinas_up gauge\n");
            output.push_str("maquinas_up 1\n");
            output
        },
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}
