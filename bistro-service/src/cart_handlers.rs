use axum::extract::{Path, Query, State};
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use serde::Deserialize;

use crate::app::AppState;
use crate::extract::ApiJson;
use crate::guards::require_self;
use crate::models::{CartItem, DeleteOutcome, InsertOutcome, NewCartItem};

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub email: Option<String>,
}

/// Lists the caller's cart. `?email=` may only name the caller.
pub async fn list_cart(
    auth: AuthContext,
    State(state): State<AppState>,
    Query(query): Query<CartQuery>,
) -> ApiResult<Json<Vec<CartItem>>> {
    let email = match query.email {
        Some(email) => email,
        None => auth.email().map(str::to_owned).ok_or_else(ApiError::forbidden)?,
    };
    require_self(&auth, &email)?;
    Ok(Json(state.store.list_cart(&email).await?))
}

/// Rows can only be added to the caller's own cart.
pub async fn add_to_cart(
    auth: AuthContext,
    State(state): State<AppState>,
    ApiJson(item): ApiJson<NewCartItem>,
) -> ApiResult<Json<InsertOutcome>> {
    require_self(&auth, &item.email)?;
    Ok(Json(state.store.insert_cart_item(item).await?))
}

/// Deletes only a row owned by the caller; anyone else's id counts 0.
pub async fn remove_from_cart(
    auth: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let owner = auth.email().ok_or_else(ApiError::forbidden)?;
    Ok(Json(state.store.delete_cart_item(&id, owner).await?))
}
