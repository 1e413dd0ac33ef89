use axum::extract::{Path, State};
use axum::Json;
use common_http_errors::{ApiError, ApiResult};

use crate::app::AppState;
use crate::extract::ApiJson;
use crate::guards::AdminContext;
use crate::models::{CreateOutcome, DeleteOutcome, MenuItem, MenuItemPatch, NewMenuItem, UpdateOutcome};

fn validate_price(price: f64) -> ApiResult<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "invalid_price",
            Some(format!("price {price} must be a non-negative number")),
        ))
    }
}

pub async fn list_menu(State(state): State<AppState>) -> ApiResult<Json<Vec<MenuItem>>> {
    Ok(Json(state.store.list_menu().await?))
}

/// Unknown ids answer `null` rather than an error.
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<MenuItem>>> {
    Ok(Json(state.store.find_menu_item(&id).await?))
}

pub async fn create_menu_item(
    _admin: AdminContext,
    State(state): State<AppState>,
    ApiJson(item): ApiJson<NewMenuItem>,
) -> ApiResult<Json<CreateOutcome>> {
    validate_price(item.price)?;
    Ok(Json(state.store.insert_menu_item(item).await?))
}

pub async fn update_menu_item(
    _admin: AdminContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<MenuItemPatch>,
) -> ApiResult<Json<UpdateOutcome>> {
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    Ok(Json(state.store.update_menu_item(&id, patch).await?))
}

pub async fn delete_menu_item(
    _admin: AdminContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    Ok(Json(state.store.delete_menu_item(&id).await?))
}
