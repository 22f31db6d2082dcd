// handlers/protected/jobs.rs - GET /api/jobs/:id/estimate

use axum::{
    extract::{Path, Query, State},
    Extension,
};

use crate::app::AppState;
use crate::handlers::utils::parse_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{EstimateQuery, EstimateService, JobEstimate};
use crate::tenant::TenantContext;

pub async fn estimate(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<EstimateQuery>,
) -> ApiResult<JobEstimate> {
    let job_id = parse_id(&id, "id")?;
    let estimate = EstimateService::new(state.store.clone(), ctx.scope()?)
        .estimate(job_id, query)
        .await?;
    Ok(ApiResponse::success(estimate))
}
