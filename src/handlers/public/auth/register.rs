// handlers/public/auth/register.rs - POST /api/auth/register

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use crate::app::AppState;
use crate::handlers::utils::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AccountService, RegisterRequest, RegisteredAccount};

/// Create an account and, when `organization_name` is given, an organization
/// the new user owns. Does not log the user in.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<RegisteredAccount> {
    let request = json_body(payload)?;
    let service = AccountService::new(state.store.clone(), state.config.security.clone());
    let account = service.register(request).await?;
    Ok(ApiResponse::with_status(account, StatusCode::CREATED))
}
