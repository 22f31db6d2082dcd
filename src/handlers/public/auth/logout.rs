// handlers/public/auth/logout.rs - POST /api/auth/logout

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::auth::expired_session_cookie;
use crate::middleware::ApiResponse;

/// Expire the session cookie. Bearer tokens stay valid until their `exp`.
pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cookie = HeaderValue::from_str(&expired_session_cookie(&state.config.security))
        .map_err(|_| ApiError::internal_server_error("Failed to build session cookie"))?;

    let mut response = ApiResponse::success(json!({ "logged_out": true })).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}
