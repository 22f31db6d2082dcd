use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{
    generate_jwt, hash_password, validate_email_format, validate_password_strength, verify_password, AuthError, Claims,
};
use crate::config::SecurityConfig;
use crate::database::models::{Organization, OrganizationMember, User};
use crate::database::TenantStore;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    /// Create an organization owned by the new user.
    pub organization_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredAccount {
    pub user: User,
    pub organization: Option<Organization>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: u64,
    pub user: User,
}

pub struct AccountService {
    store: Arc<dyn TenantStore>,
    security: SecurityConfig,
}

impl AccountService {
    pub fn new(store: Arc<dyn TenantStore>, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<RegisteredAccount, ApiError> {
        let email = User::normalize_email(&request.email);

        let mut field_errors = HashMap::new();
        if let Err(msg) = validate_email_format(&email) {
            field_errors.insert("email".to_string(), msg);
        }
        if let Err(msg) = validate_password_strength(&request.password) {
            field_errors.insert("password".to_string(), msg);
        }
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error("Registration failed validation", Some(field_errors)));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::bad_request("An account with this email already exists"));
        }

        let password = request.password.clone();
        let cost = self.security.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))??;

        let user = User {
            id: Uuid::new_v4(),
            email,
            display_name: request
                .display_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            password_hash,
            created_at: Utc::now(),
        };
        self.store.create_user(&user).await?;
        tracing::info!("Registered user {}", user.id);

        let organization = match request.organization_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                let organization = Organization::new(name);
                let owner = OrganizationMember::owner(user.id, organization.id);
                self.store.create_organization(&organization, &owner).await?;
                tracing::info!("Created organization {} owned by {}", organization.id, user.id);
                Some(organization)
            }
            _ => None,
        };

        Ok(RegisteredAccount { user, organization })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResult, ApiError> {
        let email = User::normalize_email(&request.email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        let password = request.password;
        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        if !verified {
            tracing::warn!("Login failed: wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        let claims = Claims::new(user.id, user.email.clone(), &self.security);
        let token = generate_jwt(&claims, &self.security)?;
        tracing::info!("User {} logged in", user.id);

        Ok(LoginResult {
            token,
            expires_in: self.security.jwt_expiry_hours * 3600,
            user,
        })
    }
}
