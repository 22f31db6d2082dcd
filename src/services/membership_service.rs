use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{generate_invitation_token, hash_invitation_token};
use crate::config::MAX_EXPIRY_HOURS;
use crate::database::models::{MemberRole, Organization, OrganizationMember, User};
use crate::database::TenantStore;
use crate::error::ApiError;
use crate::tenant::TenantContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    #[serde(default = "default_invite_role")]
    pub role: MemberRole,
}

fn default_invite_role() -> MemberRole {
    MemberRole::Member
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: MemberRole,
}

/// Membership as listed to clients, joined with the member's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: MemberRole,
    pub status: String,
    pub invited_at: Option<DateTime<Utc>>,
    pub invitation_expires_at: Option<DateTime<Utc>>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl MemberView {
    fn new(member: &OrganizationMember, user: Option<&User>) -> Self {
        Self {
            id: member.id,
            user_id: member.user_id,
            organization_id: member.organization_id,
            email: user.map(|u| u.email.clone()),
            display_name: user.and_then(|u| u.display_name.clone()),
            role: member.role,
            status: member.status().to_string(),
            invited_at: member.invited_at,
            invitation_expires_at: member.invitation_expires_at,
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentOrganization {
    pub organization: Organization,
    pub role: MemberRole,
}

/// A new invitation. The plain token is returned exactly once; only its
/// digest is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub member: MemberView,
    pub invitation_token: String,
}

pub struct MembershipService {
    store: Arc<dyn TenantStore>,
    invitation_expiry_hours: u64,
}

impl MembershipService {
    pub fn new(store: Arc<dyn TenantStore>, invitation_expiry_hours: u64) -> Self {
        Self {
            store,
            invitation_expiry_hours,
        }
    }

    pub async fn current_organization(&self, ctx: &TenantContext) -> Result<CurrentOrganization, ApiError> {
        let scope = ctx.scope()?;
        let organization = self
            .store
            .find_organization(scope.organization_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;
        Ok(CurrentOrganization {
            organization,
            role: ctx.role.unwrap_or(MemberRole::Member),
        })
    }

    pub async fn list_members(&self, ctx: &TenantContext, org_id: Uuid) -> Result<Vec<MemberView>, ApiError> {
        ctx.require_organization(org_id)?;
        let members = self.store.list_members(org_id).await?;

        let mut views = Vec::with_capacity(members.len());
        for member in &members {
            let user = self.store.find_user(member.user_id).await?;
            views.push(MemberView::new(member, user.as_ref()));
        }
        Ok(views)
    }

    pub async fn invite(&self, ctx: &TenantContext, org_id: Uuid, request: InviteRequest) -> Result<Invitation, ApiError> {
        ctx.require_organization(org_id)?;
        let caller_role = ctx.require_member_manager()?;
        if request.role == MemberRole::Owner && caller_role != MemberRole::Owner {
            return Err(ApiError::forbidden("Only owners can invite owners"));
        }

        let email = User::normalize_email(&request.email);
        let invitee = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::bad_request("No registered user with this email"))?;

        if self.store.find_membership(org_id, invitee.id).await?.is_some() {
            return Err(ApiError::bad_request("User is already a member of this organization"));
        }

        let token = generate_invitation_token();
        let expires_at = Utc::now() + Duration::hours(self.invitation_expiry_hours.min(MAX_EXPIRY_HOURS) as i64);
        let member = OrganizationMember::invited(invitee.id, org_id, request.role, hash_invitation_token(&token), expires_at);
        self.store.insert_member(&member).await?;

        tracing::info!("User {} invited {} to organization {} as {}", ctx.user_id, invitee.id, org_id, member.role.as_str());
        Ok(Invitation {
            member: MemberView::new(&member, Some(&invitee)),
            invitation_token: token,
        })
    }

    pub async fn accept_invitation(&self, ctx: &TenantContext, request: AcceptInvitationRequest) -> Result<MemberView, ApiError> {
        let token = request.token.trim();
        if token.is_empty() {
            return Err(ApiError::bad_request("Invalid invitation token"));
        }

        let mut member = self
            .store
            .find_invitation(&hash_invitation_token(token))
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid invitation token"))?;

        if member.user_id != ctx.user_id {
            tracing::warn!("User {} tried to accept invitation {} issued to another user", ctx.user_id, member.id);
            return Err(ApiError::forbidden("This invitation belongs to another user"));
        }
        let now = Utc::now();
        if member.is_expired(now) {
            return Err(ApiError::bad_request("Invitation has expired"));
        }

        member.accept(now);
        self.store.update_member(&member).await?;

        tracing::info!("User {} joined organization {}", ctx.user_id, member.organization_id);
        let user = self.store.find_user(member.user_id).await?;
        Ok(MemberView::new(&member, user.as_ref()))
    }

    pub async fn update_role(
        &self,
        ctx: &TenantContext,
        org_id: Uuid,
        member_id: Uuid,
        request: UpdateRoleRequest,
    ) -> Result<MemberView, ApiError> {
        ctx.require_organization(org_id)?;
        let caller_role = ctx.require_member_manager()?;

        let mut member = self.find_member(org_id, member_id).await?;
        let touches_owner = member.role == MemberRole::Owner || request.role == MemberRole::Owner;
        if touches_owner && caller_role != MemberRole::Owner {
            return Err(ApiError::forbidden("Only owners can change owner roles"));
        }
        if member.role == MemberRole::Owner && request.role != MemberRole::Owner {
            self.ensure_other_owner(org_id, member.id).await?;
        }

        member.role = request.role;
        self.store.update_member(&member).await?;

        let user = self.store.find_user(member.user_id).await?;
        Ok(MemberView::new(&member, user.as_ref()))
    }

    /// Remove a member. Anyone may leave; removing others takes owner/admin.
    pub async fn remove_member(&self, ctx: &TenantContext, org_id: Uuid, member_id: Uuid) -> Result<(), ApiError> {
        ctx.require_organization(org_id)?;
        let member = self.find_member(org_id, member_id).await?;

        if member.user_id != ctx.user_id {
            let caller_role = ctx.require_member_manager()?;
            if member.role == MemberRole::Owner && caller_role != MemberRole::Owner {
                return Err(ApiError::forbidden("Only owners can remove owners"));
            }
        }
        if member.role == MemberRole::Owner {
            self.ensure_other_owner(org_id, member.id).await?;
        }

        self.store.delete_member(org_id, member.id).await?;
        tracing::info!("User {} removed member {} from organization {}", ctx.user_id, member.id, org_id);
        Ok(())
    }

    async fn find_member(&self, org_id: Uuid, member_id: Uuid) -> Result<OrganizationMember, ApiError> {
        self.store
            .find_member(org_id, member_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Member not found"))
    }

    async fn ensure_other_owner(&self, org_id: Uuid, leaving: Uuid) -> Result<(), ApiError> {
        let owners = self
            .store
            .list_members(org_id)
            .await?
            .into_iter()
            .filter(|m| m.id != leaving && m.role == MemberRole::Owner && m.is_active())
            .count();
        if owners == 0 {
            return Err(ApiError::bad_request("Organization must keep at least one owner"));
        }
        Ok(())
    }
}
