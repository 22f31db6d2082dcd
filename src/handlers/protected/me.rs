// handlers/protected/me.rs - GET /api/auth/me

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::TenantContext;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    #[serde(flatten)]
    pub context: TenantContext,
    pub display_name: Option<String>,
}

pub async fn whoami(State(state): State<AppState>, Extension(ctx): Extension<TenantContext>) -> ApiResult<WhoAmI> {
    let display_name = state.store.find_user(ctx.user_id).await?.and_then(|u| u.display_name);
    Ok(ApiResponse::success(WhoAmI {
        context: ctx,
        display_name,
    }))
}
