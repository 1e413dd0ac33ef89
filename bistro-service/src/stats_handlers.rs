use axum::extract::State;
use axum::Json;
use common_http_errors::ApiResult;

use crate::app::AppState;
use crate::guards::AdminContext;
use crate::models::{AdminStats, CategoryStat};

pub async fn admin_stats(_admin: AdminContext, State(state): State<AppState>) -> ApiResult<Json<AdminStats>> {
    Ok(Json(state.store.admin_stats().await?))
}

pub async fn order_stats(
    _admin: AdminContext,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategoryStat>>> {
    Ok(Json(state.store.order_stats().await?))
}
