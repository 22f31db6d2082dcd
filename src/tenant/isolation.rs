//! Row-level isolation inside the database session.
//!
//! Every scoped transaction first publishes the caller's organization id as a
//! transaction-local setting. With row-level security installed, the policies
//! on tenant tables compare `organization_id` against that setting, so a
//! statement that forgot its `WHERE organization_id = ...` still cannot see
//! another organization's rows.

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::database::store::TenantScope;
use crate::database::DatabaseError;

/// Tables holding organization-owned rows.
pub const TENANT_TABLES: &[&str] = &[
    "jobs",
    "parcels",
    "fence_types",
    "gate_types",
    "components",
    "fence_segments",
    "gate_positions",
    "drawings",
    "discount_rules",
    "pricing_configs",
    "tax_regions",
];

/// How the organization id reaches the database session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionContext {
    /// Application-level filtering only.
    Disabled,
    /// `set_config(setting, org, true)` at the start of each scoped transaction.
    PostgresSetConfig { setting: String },
}

impl SessionContext {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        if config.row_level_security {
            SessionContext::PostgresSetConfig {
                setting: config.session_setting.clone(),
            }
        } else {
            SessionContext::Disabled
        }
    }

    /// Publish the scope to the current transaction. Must run on a connection
    /// inside a transaction; the setting is discarded at commit or rollback.
    pub async fn apply(&self, conn: &mut PgConnection, scope: TenantScope) -> Result<(), DatabaseError> {
        match self {
            SessionContext::Disabled => Ok(()),
            SessionContext::PostgresSetConfig { setting } => {
                sqlx::query("SELECT set_config($1, $2, true)")
                    .bind(setting)
                    .bind(scope.organization_id.to_string())
                    .execute(conn)
                    .await?;
                debug!("Session scoped to organization {}", scope.organization_id);
                Ok(())
            }
        }
    }

    /// Enable and force row-level security on every tenant table, replacing
    /// the isolation policy. Idempotent.
    pub async fn install_policies(&self, pool: &PgPool) -> Result<(), DatabaseError> {
        let SessionContext::PostgresSetConfig { setting } = self else {
            return Ok(());
        };
        if !is_valid_setting_name(setting) {
            return Err(DatabaseError::QueryError(format!("invalid session setting name '{}'", setting)));
        }

        let mut tx = pool.begin().await?;
        for statement in TENANT_TABLES.iter().flat_map(|table| policy_statements(table, setting)) {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!("Row-level security enforced on {} tables via {}", TENANT_TABLES.len(), setting);
        Ok(())
    }
}

fn policy_statements(table: &str, setting: &str) -> Vec<String> {
    let policy = format!("{}_tenant_isolation", table);
    let predicate = format!(
        "organization_id = NULLIF(current_setting('{}', true), '')::uuid",
        setting
    );
    vec![
        format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY", table),
        format!("ALTER TABLE {} FORCE ROW LEVEL SECURITY", table),
        format!("DROP POLICY IF EXISTS {} ON {}", policy, table),
        format!(
            "CREATE POLICY {} ON {} FOR ALL USING ({}) WITH CHECK ({})",
            policy, table, predicate, predicate
        ),
    ]
}

/// Custom settings must be namespaced (`prefix.name`) and are spliced into
/// policy text, so only `[a-z_.]` is accepted.
fn is_valid_setting_name(name: &str) -> bool {
    name.contains('.')
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name.chars().all(|c| c.is_ascii_lowercase() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn context_follows_config() {
        let mut config = AppConfig::for_tests().database;
        config.row_level_security = false;
        assert_eq!(SessionContext::from_config(&config), SessionContext::Disabled);

        config.row_level_security = true;
        assert_eq!(
            SessionContext::from_config(&config),
            SessionContext::PostgresSetConfig {
                setting: "app.organization_id".to_string()
            }
        );
    }

    #[test]
    fn policies_compare_against_the_session_setting() {
        let statements = policy_statements("jobs", "app.organization_id");
        assert_eq!(statements[0], "ALTER TABLE jobs ENABLE ROW LEVEL SECURITY");
        assert_eq!(statements[1], "ALTER TABLE jobs FORCE ROW LEVEL SECURITY");
        assert!(statements[3].starts_with("CREATE POLICY jobs_tenant_isolation ON jobs FOR ALL"));
        assert!(statements[3].contains("current_setting('app.organization_id', true)"));
    }

    #[test]
    fn setting_names_are_checked() {
        assert!(is_valid_setting_name("app.organization_id"));
        assert!(!is_valid_setting_name("organization_id"));
        assert!(!is_valid_setting_name("app.org'); DROP TABLE jobs; --"));
    }
}
