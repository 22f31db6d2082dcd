use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Placeholder secret used outside production; production refuses to start with it.
pub const DEVELOPMENT_JWT_SECRET: &str = "fence-estimator-development-secret";

/// Longest lifetime, in hours, accepted for session tokens and invitations.
pub const MAX_EXPIRY_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which `TenantStore` backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub store: StoreBackend,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub migration_max_attempts: u32,
    pub migration_retry_delay_secs: u64,
    /// Install row-level security policies and push the organization id into
    /// every scoped transaction via `set_config`.
    pub row_level_security: bool,
    pub session_setting: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub invitation_expiry_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        let db = &mut self.database;
        if let Ok(v) = env::var("DATABASE_URL") {
            db.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_STORE") {
            db.store = match v.to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "postgres" | "postgresql" => StoreBackend::Postgres,
                _ => db.store,
            };
        }
        parse_var("DATABASE_MAX_CONNECTIONS", &mut db.max_connections);
        parse_var("DATABASE_CONNECTION_TIMEOUT", &mut db.connection_timeout);
        parse_var("DATABASE_MIGRATION_MAX_ATTEMPTS", &mut db.migration_max_attempts);
        parse_var("DATABASE_MIGRATION_RETRY_DELAY_SECS", &mut db.migration_retry_delay_secs);
        parse_var("DATABASE_ROW_LEVEL_SECURITY", &mut db.row_level_security);
        parse_var("DATABASE_SESSION_SETTING", &mut db.session_setting);

        // FENCE_API_PORT wins over the platform-provided PORT
        parse_var("PORT", &mut self.api.port);
        parse_var("FENCE_API_PORT", &mut self.api.port);
        parse_var("API_ENABLE_REQUEST_LOGGING", &mut self.api.enable_request_logging);
        parse_var("API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);

        let sec = &mut self.security;
        parse_var("SECURITY_ENABLE_CORS", &mut sec.enable_cors);
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            sec.cors_origins = v.split(',').map(str::trim).filter(|o| !o.is_empty()).map(String::from).collect();
        }
        parse_var("JWT_SECRET", &mut sec.jwt_secret);
        parse_var("SECURITY_JWT_EXPIRY_HOURS", &mut sec.jwt_expiry_hours);
        parse_var("SECURITY_BCRYPT_COST", &mut sec.bcrypt_cost);
        parse_var("SECURITY_COOKIE_NAME", &mut sec.cookie_name);
        parse_var("SECURITY_COOKIE_SECURE", &mut sec.cookie_secure);
        parse_var("SECURITY_INVITATION_EXPIRY_HOURS", &mut sec.invitation_expiry_hours);

        self
    }

    /// Startup checks that must hold before the server accepts traffic.
    pub fn validate(&self) -> Result<(), String> {
        if self.security.jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if self.environment == Environment::Production && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET {
            return Err("JWT_SECRET must be set explicitly in production".to_string());
        }
        if self.database.store == StoreBackend::Postgres && self.database.url.is_none() {
            return Err("DATABASE_URL is required for the postgres store".to_string());
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(format!("bcrypt cost {} is outside 4..=31", self.security.bcrypt_cost));
        }
        if !(1..=MAX_EXPIRY_HOURS).contains(&self.security.jwt_expiry_hours) {
            return Err(format!(
                "JWT expiry of {} hours is outside 1..={}",
                self.security.jwt_expiry_hours, MAX_EXPIRY_HOURS
            ));
        }
        if !(1..=MAX_EXPIRY_HOURS).contains(&self.security.invitation_expiry_hours) {
            return Err(format!(
                "invitation expiry of {} hours is outside 1..={}",
                self.security.invitation_expiry_hours, MAX_EXPIRY_HOURS
            ));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                store: StoreBackend::Postgres,
                max_connections: 10,
                connection_timeout: 30,
                migration_max_attempts: 10,
                migration_retry_delay_secs: 3,
                row_level_security: false,
                session_setting: "app.organization_id".to_string(),
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 8 << 20,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string(), "http://127.0.0.1:5173".to_string()],
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 168,
                bcrypt_cost: 10,
                cookie_name: "fence_session".to_string(),
                cookie_secure: false,
                invitation_expiry_hours: 24 * 7,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                store: StoreBackend::Postgres,
                max_connections: 20,
                connection_timeout: 10,
                migration_max_attempts: 10,
                migration_retry_delay_secs: 5,
                row_level_security: true,
                session_setting: "app.organization_id".to_string(),
            },
            api: ApiConfig {
                port: 8080,
                enable_request_logging: true,
                max_request_size_bytes: 4 << 20,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.fence-estimator.app".to_string()],
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
                bcrypt_cost: 12,
                cookie_name: "fence_session".to_string(),
                cookie_secure: true,
                invitation_expiry_hours: 24 * 7,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                store: StoreBackend::Postgres,
                max_connections: 50,
                connection_timeout: 5,
                migration_max_attempts: 10,
                migration_retry_delay_secs: 5,
                row_level_security: true,
                session_setting: "app.organization_id".to_string(),
            },
            api: ApiConfig {
                port: 8080,
                enable_request_logging: false,
                max_request_size_bytes: 2 << 20,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://fence-estimator.app".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 8,
                bcrypt_cost: 12,
                cookie_name: "fence_session".to_string(),
                cookie_secure: true,
                invitation_expiry_hours: 24 * 3,
            },
        }
    }

    /// In-memory configuration used by integration tests and `DATABASE_STORE=memory`.
    pub fn for_tests() -> Self {
        let mut config = Self::development();
        config.database.store = StoreBackend::Memory;
        config.api.enable_request_logging = false;
        config.security.bcrypt_cost = 4;
        config
    }
}

/// Process-wide configuration for the binaries; the router takes its own copy.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Overwrite `target` when the variable is set and parses; malformed values keep the default.
fn parse_var<T: FromStr>(name: &str, target: &mut T) {
    if let Some(value) = env::var(name).ok().and_then(|v| v.trim().parse().ok()) {
        *target = value;
    }
}
