use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{MemberRole, OrganizationMember};
use crate::database::store::TenantScope;
use crate::error::ApiError;

/// Header that picks one of the caller's organizations when they belong to several.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// The current user as seen by every handler of one request.
///
/// Built once by the tenant middleware from a single membership lookup and
/// passed to handlers through request extensions; nothing about it is cached
/// beyond the request.
#[derive(Debug, Clone, Serialize)]
pub struct TenantContext {
    pub user_id: Uuid,
    pub email: String,
    pub is_authenticated: bool,
    pub organization_id: Option<Uuid>,
    pub role: Option<MemberRole>,
}

/// Why a requested organization could not be selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotAMember(pub Uuid);

impl TenantContext {
    /// Pick the active organization from the caller's accepted memberships.
    ///
    /// `memberships` must already be ordered by `joined_at`, then `id`; without
    /// an explicit request the first one wins.
    pub fn resolve(
        user_id: Uuid,
        email: impl Into<String>,
        memberships: &[OrganizationMember],
        requested: Option<Uuid>,
    ) -> Result<Self, NotAMember> {
        let selected = match requested {
            Some(org_id) => Some(
                memberships
                    .iter()
                    .find(|m| m.organization_id == org_id && m.is_active())
                    .ok_or(NotAMember(org_id))?,
            ),
            None => memberships.iter().find(|m| m.is_active()),
        };

        Ok(Self {
            user_id,
            email: email.into(),
            is_authenticated: true,
            organization_id: selected.map(|m| m.organization_id),
            role: selected.map(|m| m.role),
        })
    }

    /// Scope for tenant-owned data; 403 for users outside any organization.
    pub fn scope(&self) -> Result<TenantScope, ApiError> {
        self.organization_id
            .map(TenantScope::new)
            .ok_or_else(|| ApiError::forbidden("User is not a member of any organization"))
    }

    /// Organization-management routes name their target organization; it must
    /// be the caller's active one.
    pub fn require_organization(&self, org_id: Uuid) -> Result<TenantScope, ApiError> {
        let scope = self.scope()?;
        if scope.organization_id != org_id {
            tracing::warn!(
                "User {} denied access to organization {} (active: {})",
                self.user_id,
                org_id,
                scope.organization_id
            );
            return Err(ApiError::forbidden("Access to this organization is not allowed"));
        }
        Ok(scope)
    }

    pub fn require_member_manager(&self) -> Result<MemberRole, ApiError> {
        match self.role {
            Some(role) if role.can_manage_members() => Ok(role),
            _ => Err(ApiError::forbidden("Only owners and admins can manage members")),
        }
    }
}
