use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
        }
    }

    /// Owners and admins manage membership.
    pub fn can_manage_members(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl TryFrom<String> for MemberRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            other => Err(format!("unknown member role '{}'", other)),
        }
    }
}

/// Membership of a user in an organization.
///
/// A row with `joined_at == None` is a pending invitation; accepting it clears
/// the token hash and stamps `joined_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganizationMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: MemberRole,
    #[serde(skip_serializing)]
    pub invitation_token_hash: Option<String>,
    pub invited_at: Option<DateTime<Utc>>,
    pub invitation_expires_at: Option<DateTime<Utc>>,
    pub joined_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrganizationMember {
    /// Active owner membership for the user who created the organization.
    pub fn owner(user_id: Uuid, organization_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            role: MemberRole::Owner,
            invitation_token_hash: None,
            invited_at: None,
            invitation_expires_at: None,
            joined_at: Some(now),
            created_at: now,
        }
    }

    pub fn invited(
        user_id: Uuid,
        organization_id: Uuid,
        role: MemberRole,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            role,
            invitation_token_hash: Some(token_hash),
            invited_at: Some(now),
            invitation_expires_at: Some(expires_at),
            joined_at: None,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.joined_at.is_some()
    }

    pub fn status(&self) -> &'static str {
        if self.is_active() {
            "active"
        } else {
            "invited"
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.invitation_expires_at.map_or(false, |expires| now > expires)
    }

    pub fn accept(&mut self, now: DateTime<Utc>) {
        self.invitation_token_hash = None;
        self.invitation_expires_at = None;
        self.joined_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn invitation_lifecycle() {
        let now = Utc::now();
        let mut member = OrganizationMember::invited(
            Uuid::new_v4(),
            Uuid::new_v4(),
            MemberRole::Member,
            "digest".to_string(),
            now + Duration::hours(1),
        );
        assert_eq!(member.status(), "invited");
        assert!(!member.is_expired(now));
        assert!(member.is_expired(now + Duration::hours(2)));

        member.accept(now);
        assert_eq!(member.status(), "active");
        assert!(member.invitation_token_hash.is_none());
        assert!(!member.is_expired(now + Duration::days(30)));
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [MemberRole::Owner, MemberRole::Admin, MemberRole::Member] {
            assert_eq!(MemberRole::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert!(MemberRole::try_from("root".to_string()).is_err());
    }
}
