// handlers/protected/organizations.rs - Organization membership endpoints
//
// GET    /api/organizations/current
// GET    /api/organizations/:org_id/members
// POST   /api/organizations/:org_id/invitations
// POST   /api/organizations/invitations/accept
// PUT    /api/organizations/:org_id/members/:member_id/role
// DELETE /api/organizations/:org_id/members/:member_id
// POST   /api/organizations/:org_id/sample-data

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::handlers::utils::{json_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{
    seed_sample_data, AcceptInvitationRequest, CurrentOrganization, Invitation, InviteRequest, MemberView,
    MembershipService, SampleDataSummary, UpdateRoleRequest,
};
use crate::tenant::TenantContext;

fn memberships(state: &AppState) -> MembershipService {
    MembershipService::new(state.store.clone(), state.config.security.invitation_expiry_hours)
}

pub async fn current(State(state): State<AppState>, Extension(ctx): Extension<TenantContext>) -> ApiResult<CurrentOrganization> {
    Ok(ApiResponse::success(memberships(&state).current_organization(&ctx).await?))
}

pub async fn members(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(org_id): Path<String>,
) -> ApiResult<Vec<MemberView>> {
    let org_id = parse_id(&org_id, "organization id")?;
    Ok(ApiResponse::success(memberships(&state).list_members(&ctx, org_id).await?))
}

pub async fn invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(org_id): Path<String>,
    payload: Result<Json<InviteRequest>, JsonRejection>,
) -> ApiResult<Invitation> {
    let org_id = parse_id(&org_id, "organization id")?;
    let request = json_body(payload)?;
    let invitation = memberships(&state).invite(&ctx, org_id, request).await?;
    Ok(ApiResponse::with_status(invitation, StatusCode::CREATED))
}

pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    payload: Result<Json<AcceptInvitationRequest>, JsonRejection>,
) -> ApiResult<MemberView> {
    let request = json_body(payload)?;
    Ok(ApiResponse::success(memberships(&state).accept_invitation(&ctx, request).await?))
}

pub async fn update_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path((org_id, member_id)): Path<(String, String)>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> ApiResult<MemberView> {
    let org_id = parse_id(&org_id, "organization id")?;
    let member_id = parse_id(&member_id, "member id")?;
    let request = json_body(payload)?;
    let member = memberships(&state).update_role(&ctx, org_id, member_id, request).await?;
    Ok(ApiResponse::success(member))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path((org_id, member_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let org_id = parse_id(&org_id, "organization id")?;
    let member_id = parse_id(&member_id, "member id")?;
    memberships(&state).remove_member(&ctx, org_id, member_id).await?;
    Ok(ApiResponse::success(json!({ "deleted": true, "id": member_id })))
}

pub async fn sample_data(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(org_id): Path<String>,
) -> ApiResult<SampleDataSummary> {
    let org_id = parse_id(&org_id, "organization id")?;
    let scope = ctx.require_organization(org_id)?;
    let summary = seed_sample_data(state.store.clone(), scope).await?;
    Ok(ApiResponse::with_status(summary, StatusCode::CREATED))
}
