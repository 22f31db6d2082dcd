// handlers/protected/defaults.rs - GET /api/pricing-configs/default, GET /api/tax-regions/default

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::Resource;
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::TenantContext;

/// The organization's default record; 404 when none is flagged.
pub async fn default_record<R: Resource>(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<R> {
    let repo = Repository::<R>::new(state.store.clone(), ctx.scope()?);
    let record = repo
        .select_default()
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No default {} configured", R::LABEL.to_lowercase())))?;
    Ok(ApiResponse::success(record))
}
