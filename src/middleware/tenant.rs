use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;
use crate::tenant::{NotAMember, TenantContext, ORGANIZATION_HEADER};

/// Resolves the caller's active organization once per request.
///
/// Runs after [`jwt_auth_middleware`](super::auth::jwt_auth_middleware); issues
/// exactly one membership query and hands the resulting [`TenantContext`] to
/// handlers through request extensions.
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let requested = requested_organization(&request)?;
    let memberships = state.store.active_memberships(auth_user.user_id).await?;

    let context = TenantContext::resolve(auth_user.user_id, auth_user.email, &memberships, requested).map_err(
        |NotAMember(org_id)| {
            tracing::warn!("User {} requested organization {} without membership", auth_user.user_id, org_id);
            ApiError::forbidden("Not a member of the requested organization")
        },
    )?;

    tracing::debug!(
        "Resolved tenant context for user {}: organization {:?} ({} memberships)",
        context.user_id,
        context.organization_id,
        memberships.len()
    );

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

fn requested_organization(request: &Request) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = request.headers().get(ORGANIZATION_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(Some)
        .ok_or_else(|| ApiError::bad_request("X-Organization-Id must be a UUID"))
}
