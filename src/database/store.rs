use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Organization, OrganizationMember, User};

/// The organization every scoped statement runs under.
///
/// Only the tenant context middleware constructs one, from the caller's
/// resolved membership; store backends filter on it and push it into the
/// database session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope {
    pub organization_id: Uuid,
}

impl TenantScope {
    pub fn new(organization_id: Uuid) -> Self {
        Self { organization_id }
    }
}

/// Equality filter on a top-level column, e.g. `job_id = <uuid>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    pub column: &'static str,
    pub value: Value,
}

impl RowFilter {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self { column, value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Clear `is_default` on the organization's other rows in the same
    /// transaction as the write.
    pub clear_other_defaults: bool,
}

/// Columns that must be unique within an organization, per table. Postgres
/// enforces these with unique indexes; the in-memory store checks them on write.
pub const ORGANIZATION_UNIQUE_COLUMNS: &[(&str, &str)] = &[("discount_rules", "promo_code")];

/// Tables carrying an `is_default` flag limited to one row per organization.
pub const DEFAULT_FLAG_TABLES: &[&str] = &["pricing_configs", "tax_regions"];

/// Persistence boundary.
///
/// Tenant rows travel as JSON objects whose keys are column names; the typed
/// [`Repository`](super::repository::Repository) converts them to and from
/// the records in [`models`](super::models). Every tenant-row method takes a
/// [`TenantScope`] and must never read or write a row of another organization.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn list(&self, scope: TenantScope, table: &'static str, filters: &[RowFilter]) -> Result<Vec<Value>, DatabaseError>;

    async fn get(&self, scope: TenantScope, table: &'static str, id: Uuid) -> Result<Option<Value>, DatabaseError>;

    async fn insert(&self, scope: TenantScope, table: &'static str, row: Value, options: WriteOptions) -> Result<Value, DatabaseError>;

    /// Replace the mutable columns of a scoped row; `None` when no row matched.
    async fn update(
        &self,
        scope: TenantScope,
        table: &'static str,
        id: Uuid,
        row: Value,
        options: WriteOptions,
    ) -> Result<Option<Value>, DatabaseError>;

    async fn delete(&self, scope: TenantScope, table: &'static str, id: Uuid) -> Result<bool, DatabaseError>;

    /// Insert several rows of possibly different tables in one transaction.
    async fn insert_batch(&self, scope: TenantScope, rows: Vec<(&'static str, Value)>) -> Result<(), DatabaseError>;

    async fn create_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// Create an organization together with its first (owner) membership.
    async fn create_organization(&self, organization: &Organization, owner: &OrganizationMember) -> Result<(), DatabaseError>;

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError>;

    /// Accepted memberships of a user, ordered by `joined_at` then `id`.
    async fn active_memberships(&self, user_id: Uuid) -> Result<Vec<OrganizationMember>, DatabaseError>;

    async fn list_members(&self, organization_id: Uuid) -> Result<Vec<OrganizationMember>, DatabaseError>;

    async fn find_member(&self, organization_id: Uuid, member_id: Uuid) -> Result<Option<OrganizationMember>, DatabaseError>;

    async fn find_membership(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<OrganizationMember>, DatabaseError>;

    async fn find_invitation(&self, token_hash: &str) -> Result<Option<OrganizationMember>, DatabaseError>;

    async fn insert_member(&self, member: &OrganizationMember) -> Result<(), DatabaseError>;

    async fn update_member(&self, member: &OrganizationMember) -> Result<(), DatabaseError>;

    async fn delete_member(&self, organization_id: Uuid, member_id: Uuid) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Text form of a JSON value as Postgres `->>` renders it; `None` for null.
pub fn column_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Rejects anything but `[a-z_]` identifiers before they are spliced into SQL.
pub fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_guard() {
        assert!(is_safe_identifier("fence_segments"));
        assert!(is_safe_identifier("job_id"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("jobs; DROP TABLE jobs"));
        assert!(!is_safe_identifier("Jobs"));
        assert!(!is_safe_identifier("\"jobs\""));
    }

    #[test]
    fn column_text_matches_postgres_rendering() {
        let id = Uuid::new_v4();
        assert_eq!(column_text(&serde_json::json!(id)), Some(id.to_string()));
        assert_eq!(column_text(&serde_json::json!(true)), Some("true".to_string()));
        assert_eq!(column_text(&Value::Null), None);
    }
}
