// handlers/public/mod.rs - Endpoints reachable without a session token

pub mod auth;

use axum::{extract::State, http::StatusCode};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - service metadata
pub async fn root(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "store": state.config.database.store,
    })))
}

/// GET /health - pings the store; 503 while it is unreachable
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    if let Err(e) = state.store.health_check().await {
        tracing::error!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("Store unavailable"));
    }
    Ok(ApiResponse::with_status(json!({ "status": "ok" }), StatusCode::OK))
}
