// handlers/protected/resources.rs - CRUD for every tenant-owned resource
//
// GET /api/<resource>            list
// GET /api/<resource>/:id        show
// POST /api/<resource>           create (201 + Location)
// PUT /api/<resource>/:id        update
// DELETE /api/<resource>/:id     delete
// GET /api/<resource>/by-<parent>/:value

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Resource;
use crate::database::RowFilter;
use crate::handlers::utils::{json_body, parse_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ResourceService;
use crate::tenant::TenantContext;

fn service<R: Resource>(state: &AppState, ctx: &TenantContext) -> Result<ResourceService<R>, crate::error::ApiError> {
    Ok(ResourceService::new(state.store.clone(), ctx.scope()?))
}

pub async fn list<R: Resource>(State(state): State<AppState>, Extension(ctx): Extension<TenantContext>) -> ApiResult<Vec<R>> {
    let records = service::<R>(&state, &ctx)?.list(&[]).await?;
    Ok(ApiResponse::success(records))
}

/// List rows whose parent column equals the path value.
pub async fn list_by<R: Resource>(state: AppState, ctx: TenantContext, value: String, column: &'static str) -> ApiResult<Vec<R>> {
    let parent_id = parse_id(&value, column)?;
    let records = service::<R>(&state, &ctx)?
        .list(&[RowFilter::eq(column, parent_id.to_string())])
        .await?;
    Ok(ApiResponse::success(records))
}

pub async fn get<R: Resource>(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<R> {
    let id = parse_id(&id, "id")?;
    Ok(ApiResponse::success(service::<R>(&state, &ctx)?.get(id).await?))
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    payload: Result<Json<R::Input>, JsonRejection>,
) -> ApiResult<R> {
    let input = json_body(payload)?;
    let record = service::<R>(&state, &ctx)?.create(input).await?;
    let location = format!("{}/{}", R::PATH, record.id());
    Ok(ApiResponse::created(record, location))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
    payload: Result<Json<R::Input>, JsonRejection>,
) -> ApiResult<R> {
    let id = parse_id(&id, "id")?;
    let input = json_body(payload)?;
    Ok(ApiResponse::success(service::<R>(&state, &ctx)?.update(id, input).await?))
}

pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "id")?;
    service::<R>(&state, &ctx)?.delete(id).await?;
    Ok(ApiResponse::success(json!({ "deleted": true, "id": id })))
}
