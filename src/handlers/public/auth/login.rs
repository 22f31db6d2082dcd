// handlers/public/auth/login.rs - POST /api/auth/login

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::utils::json_body;
use crate::middleware::auth::session_cookie;
use crate::middleware::ApiResponse;
use crate::services::{AccountService, LoginRequest};

/// Verify credentials; the token is returned in the body and set as the session cookie.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(payload)?;
    let security = &state.config.security;
    let result = AccountService::new(state.store.clone(), security.clone())
        .login(request)
        .await?;

    let cookie = HeaderValue::from_str(&session_cookie(security, &result.token))
        .map_err(|_| ApiError::internal_server_error("Failed to build session cookie"))?;

    let mut response = ApiResponse::success(result).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}
