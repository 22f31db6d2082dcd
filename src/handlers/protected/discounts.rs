// handlers/protected/discounts.rs - POST /api/discounts/validate

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;

use crate::app::AppState;
use crate::database::models::DiscountRule;
use crate::database::Repository;
use crate::handlers::utils::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{validate_promo, AppliedDiscount, ValidatePromoRequest};
use crate::tenant::TenantContext;

pub async fn validate(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    payload: Result<Json<ValidatePromoRequest>, JsonRejection>,
) -> ApiResult<AppliedDiscount> {
    let request = json_body(payload)?;
    let repo = Repository::<DiscountRule>::new(state.store.clone(), ctx.scope()?);
    let applied = validate_promo(&repo, &request, Utc::now()).await?;
    Ok(ApiResponse::success(applied))
}
