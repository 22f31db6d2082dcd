use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{validate_jwt, AuthError, Claims};
use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Identity proven by a valid session token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// JWT authentication middleware: accepts a Bearer token or the session cookie
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let security = &state.config.security;

    let claims = extract_token(request.headers(), &security.cookie_name)
        .and_then(|token| validate_jwt(&token, security))
        .map_err(|e| {
            tracing::warn!("Rejected request to {}: {}", request.uri().path(), e);
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Session token from `Authorization: Bearer` or, failing that, the session cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidToken("Invalid Authorization header format".to_string()))?;
        return match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Some(_) => Err(AuthError::InvalidToken("Empty JWT token".to_string())),
            None => Err(AuthError::InvalidToken(
                "Authorization header must use Bearer token format".to_string(),
            )),
        };
    }

    read_cookie(headers, cookie_name).ok_or(AuthError::MissingToken)
}

/// Value of a named cookie across all `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(security: &SecurityConfig, token: &str) -> String {
    let max_age = security.jwt_expiry_hours * 3600;
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        security.cookie_name,
        token,
        max_age,
        if security.cookie_secure { "; Secure" } else { "" }
    )
}

pub fn expired_session_cookie(security: &SecurityConfig) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
        security.cookie_name,
        if security.cookie_secure { "; Secure" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        headers.insert(header::COOKIE, HeaderValue::from_static("fence_session=cookie-token"));
        assert_eq!(extract_token(&headers, "fence_session").unwrap(), "abc.def.ghi");
    }

    #[test]
    fn cookie_is_used_without_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; fence_session=tok123; other=1"));
        assert_eq!(extract_token(&headers, "fence_session").unwrap(), "tok123");
    }

    #[test]
    fn missing_and_malformed_tokens() {
        let headers = HeaderMap::new();
        assert!(matches!(extract_token(&headers, "fence_session"), Err(AuthError::MissingToken)));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(extract_token(&headers, "fence_session"), Err(AuthError::InvalidToken(_))));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("fence_session="));
        assert!(read_cookie(&headers, "fence_session").is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let mut security = AppConfig::for_tests().security;
        security.jwt_expiry_hours = 1;
        let cookie = session_cookie(&security, "tok");
        assert_eq!(cookie, "fence_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600");

        security.cookie_secure = true;
        assert!(expired_session_cookie(&security).ends_with("Max-Age=0; Secure"));
    }
}
