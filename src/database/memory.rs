//! `TenantStore` kept in process memory.
//!
//! Backs the integration tests and `DATABASE_STORE=memory`. It enforces the
//! same constraints the Postgres schema does (per-organization promo code
//! uniqueness, a single default row, unique emails and memberships) so the
//! HTTP layer behaves identically on both backends.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Organization, OrganizationMember, User};
use super::store::{
    column_text, RowFilter, TenantScope, TenantStore, WriteOptions, DEFAULT_FLAG_TABLES, ORGANIZATION_UNIQUE_COLUMNS,
};

#[derive(Default)]
struct Tables {
    rows: HashMap<&'static str, Vec<Value>>,
    users: Vec<User>,
    organizations: Vec<Organization>,
    members: Vec<OrganizationMember>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn uuid_field(row: &Value, field: &str) -> Option<Uuid> {
    row.get(field).and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

fn owned_by(row: &Value, scope: TenantScope) -> bool {
    uuid_field(row, "organization_id") == Some(scope.organization_id)
}

fn matches_filters(row: &Value, filters: &[RowFilter]) -> bool {
    filters.iter().all(|f| {
        let actual = row.get(f.column).and_then(column_text);
        actual.is_some() && actual == column_text(&f.value)
    })
}

impl Tables {
    fn table(&mut self, table: &'static str) -> &mut Vec<Value> {
        self.rows.entry(table).or_default()
    }

    /// Mirror of the unique indexes in the schema. The single-default rule is
    /// skipped when the write is about to clear the other defaults.
    fn check_constraints(
        &self,
        scope: TenantScope,
        table: &'static str,
        row: &Value,
        id: Option<Uuid>,
        options: WriteOptions,
    ) -> Result<(), DatabaseError> {
        let Some(rows) = self.rows.get(table) else {
            return Ok(());
        };
        let others: Vec<&Value> = rows
            .iter()
            .filter(|r| owned_by(r, scope) && uuid_field(r, "id") != id)
            .collect();

        for (unique_table, column) in ORGANIZATION_UNIQUE_COLUMNS {
            if *unique_table != table {
                continue;
            }
            let value = row.get(*column).and_then(column_text);
            if value.is_some() && others.iter().any(|r| r.get(*column).and_then(column_text) == value) {
                return Err(DatabaseError::UniqueViolation(format!("{}_org_{}_key", table, column)));
            }
        }

        let is_default = |r: &Value| r.get("is_default") == Some(&Value::Bool(true));
        if DEFAULT_FLAG_TABLES.contains(&table)
            && !options.clear_other_defaults
            && is_default(row)
            && others.iter().any(|r| is_default(*r))
        {
            return Err(DatabaseError::UniqueViolation(format!("{}_one_default_idx", table)));
        }
        Ok(())
    }

    fn clear_defaults(&mut self, scope: TenantScope, table: &'static str, keep: Option<Uuid>) {
        for row in self.table(table).iter_mut() {
            if owned_by(row, scope) && uuid_field(row, "id") != keep {
                if let Some(flag) = row.get_mut("is_default") {
                    *flag = Value::Bool(false);
                }
            }
        }
    }

    fn insert_row(&mut self, scope: TenantScope, table: &'static str, mut row: Value, options: WriteOptions) -> Result<Value, DatabaseError> {
        let object = row
            .as_object_mut()
            .ok_or_else(|| DatabaseError::Serialization("row must be a JSON object".to_string()))?;
        object.insert("organization_id".to_string(), Value::String(scope.organization_id.to_string()));
        let id = uuid_field(&row, "id");

        self.check_constraints(scope, table, &row, id, options)?;
        if options.clear_other_defaults {
            self.clear_defaults(scope, table, id);
        }
        self.table(table).push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn list(&self, scope: TenantScope, table: &'static str, filters: &[RowFilter]) -> Result<Vec<Value>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rows
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| owned_by(r, scope) && matches_filters(r, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, scope: TenantScope, table: &'static str, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rows
            .get(table)
            .and_then(|rows| rows.iter().find(|r| owned_by(r, scope) && uuid_field(r, "id") == Some(id)))
            .cloned())
    }

    async fn insert(&self, scope: TenantScope, table: &'static str, row: Value, options: WriteOptions) -> Result<Value, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.insert_row(scope, table, row, options)
    }

    async fn update(
        &self,
        scope: TenantScope,
        table: &'static str,
        id: Uuid,
        mut row: Value,
        options: WriteOptions,
    ) -> Result<Option<Value>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(position) = tables
            .rows
            .get(table)
            .and_then(|rows| rows.iter().position(|r| owned_by(r, scope) && uuid_field(r, "id") == Some(id)))
        else {
            return Ok(None);
        };

        let current = tables.table(table)[position].clone();
        let (Some(target), Some(existing)) = (row.as_object_mut(), current.as_object()) else {
            return Err(DatabaseError::Serialization("row must be a JSON object".to_string()));
        };
        for column in ["id", "organization_id", "created_at"] {
            if let Some(value) = existing.get(column) {
                target.insert(column.to_string(), value.clone());
            }
        }

        tables.check_constraints(scope, table, &row, Some(id), options)?;
        if options.clear_other_defaults {
            tables.clear_defaults(scope, table, Some(id));
        }
        tables.table(table)[position] = row.clone();
        Ok(Some(row))
    }

    async fn delete(&self, scope: TenantScope, table: &'static str, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let rows = tables.table(table);
        let before = rows.len();
        rows.retain(|r| !(owned_by(r, scope) && uuid_field(r, "id") == Some(id)));
        Ok(rows.len() < before)
    }

    async fn insert_batch(&self, scope: TenantScope, rows: Vec<(&'static str, Value)>) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        // All or nothing: restore the snapshot when any row is rejected.
        let snapshot = tables.rows.clone();
        for (table, row) in rows {
            if let Err(err) = tables.insert_row(scope, table, row, WriteOptions::default()) {
                tables.rows = snapshot;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_organization(&self, organization: &Organization, owner: &OrganizationMember) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == owner.user_id) {
            return Err(DatabaseError::ForeignKeyViolation("organization_members_user_id_fkey".to_string()));
        }
        tables.organizations.push(organization.clone());
        tables.members.push(owner.clone());
        Ok(())
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn active_memberships(&self, user_id: Uuid) -> Result<Vec<OrganizationMember>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut members: Vec<_> = tables
            .members
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active())
            .cloned()
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn list_members(&self, organization_id: Uuid) -> Result<Vec<OrganizationMember>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn find_member(&self, organization_id: Uuid, member_id: Uuid) -> Result<Option<OrganizationMember>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .find(|m| m.organization_id == organization_id && m.id == member_id)
            .cloned())
    }

    async fn find_membership(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<OrganizationMember>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn find_invitation(&self, token_hash: &str) -> Result<Option<OrganizationMember>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .find(|m| m.invitation_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn insert_member(&self, member: &OrganizationMember) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables
            .members
            .iter()
            .any(|m| m.organization_id == member.organization_id && m.user_id == member.user_id)
        {
            return Err(DatabaseError::UniqueViolation("organization_members_org_user_key".to_string()));
        }
        tables.members.push(member.clone());
        Ok(())
    }

    async fn update_member(&self, member: &OrganizationMember) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .members
            .iter_mut()
            .find(|m| m.id == member.id && m.organization_id == member.organization_id)
            .ok_or_else(|| DatabaseError::NotFound("Member not found".to_string()))?;
        *existing = member.clone();
        Ok(())
    }

    async fn delete_member(&self, organization_id: Uuid, member_id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.members.len();
        tables
            .members
            .retain(|m| !(m.organization_id == organization_id && m.id == member_id));
        Ok(tables.members.len() < before)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: Uuid, extra: Value) -> Value {
        let mut value = json!({ "id": id.to_string(), "created_at": "2024-01-01T00:00:00Z" });
        if let (Some(target), Some(source)) = (value.as_object_mut(), extra.as_object()) {
            target.extend(source.clone());
        }
        value
    }

    #[tokio::test]
    async fn rows_are_invisible_across_organizations() {
        let store = MemoryStore::new();
        let a = TenantScope::new(Uuid::new_v4());
        let b = TenantScope::new(Uuid::new_v4());
        let id = Uuid::new_v4();

        store.insert(a, "jobs", row(id, json!({"name": "A"})), WriteOptions::default()).await.unwrap();

        assert!(store.get(b, "jobs", id).await.unwrap().is_none());
        assert!(store.list(b, "jobs", &[]).await.unwrap().is_empty());
        assert!(store.update(b, "jobs", id, row(id, json!({"name": "B"})), WriteOptions::default()).await.unwrap().is_none());
        assert!(!store.delete(b, "jobs", id).await.unwrap());
        assert_eq!(store.get(a, "jobs", id).await.unwrap().unwrap()["name"], "A");
    }

    #[tokio::test]
    async fn insert_stamps_the_scope_organization() {
        let store = MemoryStore::new();
        let scope = TenantScope::new(Uuid::new_v4());
        let stored = store
            .insert(scope, "jobs", row(Uuid::new_v4(), json!({"organization_id": Uuid::new_v4().to_string()})), WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(stored["organization_id"], json!(scope.organization_id.to_string()));
    }

    #[tokio::test]
    async fn promo_codes_are_unique_per_organization() {
        let store = MemoryStore::new();
        let a = TenantScope::new(Uuid::new_v4());
        let b = TenantScope::new(Uuid::new_v4());
        let code = json!({"promo_code": "SPRING10"});

        store.insert(a, "discount_rules", row(Uuid::new_v4(), code.clone()), WriteOptions::default()).await.unwrap();
        store.insert(b, "discount_rules", row(Uuid::new_v4(), code.clone()), WriteOptions::default()).await.unwrap();

        let err = store
            .insert(a, "discount_rules", row(Uuid::new_v4(), code), WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(c) if c.contains("promo_code")));
    }

    #[tokio::test]
    async fn new_default_clears_previous_one() {
        let store = MemoryStore::new();
        let scope = TenantScope::new(Uuid::new_v4());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let clear = WriteOptions { clear_other_defaults: true };

        store.insert(scope, "pricing_configs", row(first, json!({"is_default": true})), clear).await.unwrap();
        store.insert(scope, "pricing_configs", row(second, json!({"is_default": true})), clear).await.unwrap();

        let defaults: Vec<_> = store
            .list(scope, "pricing_configs", &[RowFilter::eq("is_default", true)])
            .await
            .unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0]["id"], json!(second.to_string()));

        // Without clearing, a second default is a constraint violation.
        let err = store
            .insert(scope, "pricing_configs", row(Uuid::new_v4(), json!({"is_default": true})), WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(c) if c.contains("default")));
    }

    #[tokio::test]
    async fn failed_batch_leaves_nothing_behind() {
        let store = MemoryStore::new();
        let scope = TenantScope::new(Uuid::new_v4());
        let code = json!({"promo_code": "DUP"});

        let result = store
            .insert_batch(
                scope,
                vec![
                    ("jobs", row(Uuid::new_v4(), json!({"name": "Sample"}))),
                    ("discount_rules", row(Uuid::new_v4(), code.clone())),
                    ("discount_rules", row(Uuid::new_v4(), code)),
                ],
            )
            .await;
        assert!(result.is_err());
        assert!(store.list(scope, "jobs", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memberships_are_ordered_by_join_time() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            display_name: None,
            password_hash: "x".to_string(),
            created_at: chrono::Utc::now(),
        };
        store.create_user(&user).await.unwrap();

        let later = OrganizationMember::owner(user.id, Uuid::new_v4());
        let mut earlier = OrganizationMember::owner(user.id, Uuid::new_v4());
        earlier.joined_at = later.joined_at.map(|t| t - chrono::Duration::days(1));
        store.insert_member(&later).await.unwrap();
        store.insert_member(&earlier).await.unwrap();

        let active = store.active_memberships(user.id).await.unwrap();
        assert_eq!(active[0].id, earlier.id);
        assert_eq!(active[1].id, later.id);
        assert!(store.insert_member(&later).await.is_err());
    }
}
