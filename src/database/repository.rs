use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Reference, Resource};
use crate::database::store::{RowFilter, TenantScope, TenantStore, WriteOptions};

/// Typed, organization-scoped access to one resource table.
pub struct Repository<R> {
    store: Arc<dyn TenantStore>,
    scope: TenantScope,
    _phantom: PhantomData<R>,
}

impl<R: Resource> Repository<R> {
    pub fn new(store: Arc<dyn TenantStore>, scope: TenantScope) -> Self {
        Self {
            store,
            scope,
            _phantom: PhantomData,
        }
    }

    pub fn scope(&self) -> TenantScope {
        self.scope
    }

    pub async fn select_any(&self, filters: &[RowFilter]) -> Result<Vec<R>, DatabaseError> {
        self.store
            .list(self.scope, R::TABLE, filters)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<R>, DatabaseError> {
        self.store.get(self.scope, R::TABLE, id).await?.map(decode).transpose()
    }

    /// Like [`select_one`](Self::select_one), but absence is an error. Rows of
    /// other organizations are reported exactly like missing ones.
    pub async fn select_404(&self, id: Uuid) -> Result<R, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", R::LABEL)))
    }

    /// First row with the given column value, e.g. a promo code lookup.
    pub async fn select_by(&self, column: &'static str, value: impl Into<Value>) -> Result<Option<R>, DatabaseError> {
        Ok(self.select_any(&[RowFilter::eq(column, value)]).await?.into_iter().next())
    }

    /// The organization's default row, for resources with a default flag.
    pub async fn select_default(&self) -> Result<Option<R>, DatabaseError> {
        self.select_by("is_default", true).await
    }

    pub async fn insert(&self, record: &R) -> Result<R, DatabaseError> {
        let row = serde_json::to_value(record)?;
        let stored = self.store.insert(self.scope, R::TABLE, row, Self::write_options(record)).await?;
        decode(stored)
    }

    pub async fn update(&self, record: &R) -> Result<R, DatabaseError> {
        let row = serde_json::to_value(record)?;
        self.store
            .update(self.scope, R::TABLE, record.id(), row, Self::write_options(record))
            .await?
            .map(decode)
            .transpose()?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", R::LABEL)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.store.delete(self.scope, R::TABLE, id).await
    }

    /// Whether a referenced record exists inside this organization.
    pub async fn reference_exists(&self, reference: &Reference) -> Result<bool, DatabaseError> {
        Ok(self.store.get(self.scope, reference.table, reference.id).await?.is_some())
    }

    fn write_options(record: &R) -> WriteOptions {
        WriteOptions {
            clear_other_defaults: R::HAS_DEFAULT_FLAG && record.is_default(),
        }
    }
}

fn decode<R: Resource>(row: Value) -> Result<R, DatabaseError> {
    Ok(serde_json::from_value(row)?)
}
