use axum::extract::State;
use axum::Json;
use common_http_errors::ApiResult;

use crate::app::AppState;
use crate::models::Review;

pub async fn list_reviews(State(state): State<AppState>) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.store.list_reviews().await?))
}
