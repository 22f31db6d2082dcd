//! `TenantStore` over Postgres.
//!
//! Tenant rows are read with `to_jsonb(t)` and written through
//! `jsonb_populate_record(NULL::<table>, $1)`, so one set of statements serves
//! every resource table. Each scoped call runs in its own transaction that
//! starts by applying the session context.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Organization, OrganizationMember, User};
use super::store::{column_text, is_safe_identifier, RowFilter, TenantScope, TenantStore, WriteOptions};
use crate::tenant::SessionContext;

/// Columns a client write never replaces.
const IMMUTABLE_COLUMNS: &[&str] = &["id", "organization_id", "created_at"];

const MEMBER_COLUMNS: &str = "id, user_id, organization_id, role, invitation_token_hash, invited_at, \
     invitation_expires_at, joined_at, created_at";

pub struct PgStore {
    pool: PgPool,
    session: SessionContext,
}

impl PgStore {
    pub fn new(pool: PgPool, session: SessionContext) -> Self {
        Self { pool, session }
    }

    async fn begin_scoped(&self, scope: TenantScope) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        self.session.apply(&mut *tx, scope).await?;
        Ok(tx)
    }

    async fn insert_row(
        tx: &mut Transaction<'static, Postgres>,
        scope: TenantScope,
        table: &'static str,
        mut row: Value,
    ) -> Result<Value, DatabaseError> {
        check_identifier(table)?;
        stamp_organization(&mut row, scope)?;

        let sql = format!(
            "INSERT INTO {table} AS t SELECT * FROM jsonb_populate_record(NULL::{table}, $1) RETURNING to_jsonb(t)"
        );
        let inserted = sqlx::query_scalar::<_, Value>(&sql).bind(&row).fetch_one(&mut **tx).await?;
        Ok(inserted)
    }

    async fn clear_other_defaults(
        tx: &mut Transaction<'static, Postgres>,
        scope: TenantScope,
        table: &'static str,
        keep: &Value,
    ) -> Result<(), DatabaseError> {
        let keep_id = row_id(keep)?;
        let sql = format!("UPDATE {table} SET is_default = false WHERE organization_id = $1 AND is_default AND id <> $2");
        let cleared = sqlx::query(&sql)
            .bind(scope.organization_id)
            .bind(keep_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();
        if cleared > 0 {
            tracing::debug!("Cleared {} previous default(s) in {}", cleared, table);
        }
        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), DatabaseError> {
    if is_safe_identifier(name) {
        Ok(())
    } else {
        Err(DatabaseError::QueryError(format!("invalid identifier '{}'", name)))
    }
}

fn stamp_organization(row: &mut Value, scope: TenantScope) -> Result<(), DatabaseError> {
    let object = row
        .as_object_mut()
        .ok_or_else(|| DatabaseError::Serialization("row must be a JSON object".to_string()))?;
    object.insert("organization_id".to_string(), Value::String(scope.organization_id.to_string()));
    Ok(())
}

fn row_id(row: &Value) -> Result<Uuid, DatabaseError> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| DatabaseError::Serialization("row has no id".to_string()))
}

/// Column list for `UPDATE ... SET (cols) = (SELECT cols ...)`.
fn mutable_columns(row: &Value) -> Result<Vec<&str>, DatabaseError> {
    let object = row
        .as_object()
        .ok_or_else(|| DatabaseError::Serialization("row must be a JSON object".to_string()))?;
    let mut columns = Vec::new();
    for key in object.keys() {
        if IMMUTABLE_COLUMNS.contains(&key.as_str()) {
            continue;
        }
        check_identifier(key)?;
        columns.push(key.as_str());
    }
    if columns.is_empty() {
        return Err(DatabaseError::QueryError("nothing to update".to_string()));
    }
    Ok(columns)
}

fn select_sql(table: &str, filters: &[RowFilter]) -> Result<String, DatabaseError> {
    check_identifier(table)?;
    let mut sql = format!("SELECT to_jsonb(t) FROM {table} t WHERE t.organization_id = $1");
    for (i, filter) in filters.iter().enumerate() {
        check_identifier(filter.column)?;
        sql.push_str(&format!(" AND (to_jsonb(t) ->> '{}') = ${}", filter.column, i + 2));
    }
    sql.push_str(" ORDER BY t.created_at, t.id");
    Ok(sql)
}

#[async_trait]
impl TenantStore for PgStore {
    async fn list(&self, scope: TenantScope, table: &'static str, filters: &[RowFilter]) -> Result<Vec<Value>, DatabaseError> {
        let sql = select_sql(table, filters)?;
        let mut tx = self.begin_scoped(scope).await?;

        let mut query = sqlx::query_scalar::<_, Value>(&sql).bind(scope.organization_id);
        for filter in filters {
            query = query.bind(column_text(&filter.value));
        }
        let rows = query.fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok(rows)
    }

    async fn get(&self, scope: TenantScope, table: &'static str, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        check_identifier(table)?;
        let sql = format!("SELECT to_jsonb(t) FROM {table} t WHERE t.id = $1 AND t.organization_id = $2");
        let mut tx = self.begin_scoped(scope).await?;

        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .bind(scope.organization_id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn insert(&self, scope: TenantScope, table: &'static str, row: Value, options: WriteOptions) -> Result<Value, DatabaseError> {
        let mut tx = self.begin_scoped(scope).await?;
        if options.clear_other_defaults {
            Self::clear_other_defaults(&mut tx, scope, table, &row).await?;
        }
        let inserted = Self::insert_row(&mut tx, scope, table, row).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn update(
        &self,
        scope: TenantScope,
        table: &'static str,
        id: Uuid,
        row: Value,
        options: WriteOptions,
    ) -> Result<Option<Value>, DatabaseError> {
        check_identifier(table)?;
        let columns = mutable_columns(&row)?.join(", ");
        let sql = format!(
            "UPDATE {table} AS t SET ({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)) \
             WHERE t.id = $2 AND t.organization_id = $3 RETURNING to_jsonb(t)"
        );

        let mut tx = self.begin_scoped(scope).await?;
        if options.clear_other_defaults {
            Self::clear_other_defaults(&mut tx, scope, table, &row).await?;
        }
        let updated = sqlx::query_scalar::<_, Value>(&sql)
            .bind(&row)
            .bind(id)
            .bind(scope.organization_id)
            .fetch_optional(&mut *tx)
            .await?;

        match updated {
            Some(value) => {
                tx.commit().await?;
                Ok(Some(value))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    async fn delete(&self, scope: TenantScope, table: &'static str, id: Uuid) -> Result<bool, DatabaseError> {
        check_identifier(table)?;
        let sql = format!("DELETE FROM {table} WHERE id = $1 AND organization_id = $2");
        let mut tx = self.begin_scoped(scope).await?;

        let affected = sqlx::query(&sql)
            .bind(id)
            .bind(scope.organization_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(affected > 0)
    }

    async fn insert_batch(&self, scope: TenantScope, rows: Vec<(&'static str, Value)>) -> Result<(), DatabaseError> {
        let mut tx = self.begin_scoped(scope).await?;
        for (table, row) in rows {
            Self::insert_row(&mut tx, scope, table, row).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO users (id, email, display_name, password_hash, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, display_name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, display_name, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_organization(&self, organization: &Organization, owner: &OrganizationMember) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO organizations (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(organization.id)
            .bind(&organization.name)
            .bind(organization.created_at)
            .bind(organization.updated_at)
            .execute(&mut *tx)
            .await?;
        insert_member_row(&mut tx, owner).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let org = sqlx::query_as::<_, Organization>("SELECT id, name, created_at, updated_at FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }

    async fn active_memberships(&self, user_id: Uuid) -> Result<Vec<OrganizationMember>, DatabaseError> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM organization_members \
             WHERE user_id = $1 AND joined_at IS NOT NULL ORDER BY joined_at, id"
        );
        let members = sqlx::query_as::<_, OrganizationMember>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    async fn list_members(&self, organization_id: Uuid) -> Result<Vec<OrganizationMember>, DatabaseError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM organization_members WHERE organization_id = $1 ORDER BY created_at, id");
        let members = sqlx::query_as::<_, OrganizationMember>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    async fn find_member(&self, organization_id: Uuid, member_id: Uuid) -> Result<Option<OrganizationMember>, DatabaseError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM organization_members WHERE organization_id = $1 AND id = $2");
        let member = sqlx::query_as::<_, OrganizationMember>(&sql)
            .bind(organization_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn find_membership(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<OrganizationMember>, DatabaseError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM organization_members WHERE organization_id = $1 AND user_id = $2");
        let member = sqlx::query_as::<_, OrganizationMember>(&sql)
            .bind(organization_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn find_invitation(&self, token_hash: &str) -> Result<Option<OrganizationMember>, DatabaseError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM organization_members WHERE invitation_token_hash = $1");
        let member = sqlx::query_as::<_, OrganizationMember>(&sql)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn insert_member(&self, member: &OrganizationMember) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        insert_member_row(&mut tx, member).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_member(&self, member: &OrganizationMember) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE organization_members SET role = $1, invitation_token_hash = $2, invited_at = $3, \
             invitation_expires_at = $4, joined_at = $5 WHERE id = $6 AND organization_id = $7",
        )
        .bind(member.role.as_str())
        .bind(&member.invitation_token_hash)
        .bind(member.invited_at)
        .bind(member.invitation_expires_at)
        .bind(member.joined_at)
        .bind(member.id)
        .bind(member.organization_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Member not found".to_string()));
        }
        Ok(())
    }

    async fn delete_member(&self, organization_id: Uuid, member_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM organization_members WHERE organization_id = $1 AND id = $2")
            .bind(organization_id)
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

async fn insert_member_row(tx: &mut Transaction<'static, Postgres>, member: &OrganizationMember) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO organization_members (id, user_id, organization_id, role, invitation_token_hash, invited_at, \
         invitation_expires_at, joined_at, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(member.id)
    .bind(member.user_id)
    .bind(member.organization_id)
    .bind(member.role.as_str())
    .bind(&member.invitation_token_hash)
    .bind(member.invited_at)
    .bind(member.invitation_expires_at)
    .bind(member.joined_at)
    .bind(member.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_sql_filters_by_organization_and_columns() {
        let sql = select_sql("fence_segments", &[RowFilter::eq("job_id", json!("x"))]).unwrap();
        assert_eq!(
            sql,
            "SELECT to_jsonb(t) FROM fence_segments t WHERE t.organization_id = $1 \
             AND (to_jsonb(t) ->> 'job_id') = $2 ORDER BY t.created_at, t.id"
        );
        assert!(select_sql("jobs; --", &[]).is_err());
        assert!(select_sql("jobs", &[RowFilter::eq("job_id') OR ('1", json!(1))]).is_err());
    }

    #[test]
    fn updates_skip_identity_columns() {
        let row = json!({
            "id": Uuid::new_v4(),
            "organization_id": Uuid::new_v4(),
            "created_at": "2024-01-01T00:00:00Z",
            "name": "Backyard",
            "updated_at": "2024-01-02T00:00:00Z"
        });
        let mut columns = mutable_columns(&row).unwrap();
        columns.sort();
        assert_eq!(columns, vec!["name", "updated_at"]);
    }

    #[test]
    fn stamping_overrides_client_organization() {
        let scope = TenantScope::new(Uuid::new_v4());
        let mut row = json!({"organization_id": Uuid::new_v4()});
        stamp_organization(&mut row, scope).unwrap();
        assert_eq!(row["organization_id"], json!(scope.organization_id.to_string()));
    }
}
