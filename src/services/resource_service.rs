use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{Resource, Stamp};
use crate::database::{DatabaseError, Repository, RowFilter, TenantScope, TenantStore};
use crate::error::ApiError;

/// Write rules shared by every tenant resource: server stamping, field
/// validation, same-organization references and per-organization uniqueness.
pub struct ResourceService<R> {
    repo: Repository<R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(store: Arc<dyn TenantStore>, scope: TenantScope) -> Self {
        Self {
            repo: Repository::new(store, scope),
        }
    }

    pub fn repository(&self) -> &Repository<R> {
        &self.repo
    }

    pub async fn list(&self, filters: &[RowFilter]) -> Result<Vec<R>, ApiError> {
        Ok(self.repo.select_any(filters).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<R, ApiError> {
        Ok(self.repo.select_404(id).await?)
    }

    /// Create from client input. Identity, organization and timestamps are
    /// always server-assigned.
    pub async fn create(&self, input: R::Input) -> Result<R, ApiError> {
        let record = R::from_input(input, Stamp::new(self.repo.scope().organization_id));
        self.check_write(&record).await?;
        let created = self.repo.insert(&record).await?;
        tracing::info!("Created {} {}", R::LABEL, created.id());
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, input: R::Input) -> Result<R, ApiError> {
        let mut record = self.repo.select_404(id).await?;
        record.apply_input(input, Utc::now());
        self.check_write(&record).await?;
        Ok(self.repo.update(&record).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        if !self.repo.delete(id).await? {
            return Err(ApiError::not_found(format!("{} not found", R::LABEL)));
        }
        tracing::info!("Deleted {} {}", R::LABEL, id);
        Ok(())
    }

    async fn check_write(&self, record: &R) -> Result<(), ApiError> {
        let field_errors = record.validate();
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error(
                format!("{} failed validation", R::LABEL),
                Some(field_errors),
            ));
        }

        for reference in record.references() {
            if !self.repo.reference_exists(&reference).await? {
                tracing::warn!(
                    "{} write rejected: {} {} is missing or outside organization {}",
                    R::LABEL,
                    reference.label,
                    reference.id,
                    self.repo.scope().organization_id
                );
                return Err(ApiError::bad_request(format!("{} not found or access denied", reference.label)));
            }
        }

        if let Some((column, value)) = record.unique_value() {
            if let Some(existing) = self.repo.select_by(column, value).await? {
                if existing.id() != record.id() {
                    return Err(DatabaseError::UniqueViolation(format!("{}_org_{}_key", R::TABLE, column)).into());
                }
            }
        }
        Ok(())
    }
}
