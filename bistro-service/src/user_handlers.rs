use axum::extract::{Path, State};
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::ApiResult;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::extract::ApiJson;
use crate::guards::{require_self, AdminContext};
use crate::models::{CreateOutcome, DeleteOutcome, NewUser, UpdateOutcome, User};

pub async fn list_users(_admin: AdminContext, State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

/// `{admin: bool}` for the caller's own email.
pub async fn check_admin(
    auth: AuthContext,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Value>> {
    require_self(&auth, &email)?;
    let admin = state
        .store
        .find_user_by_email(&email)
        .await?
        .map(|user| user.is_admin())
        .unwrap_or(false);
    Ok(Json(json!({ "admin": admin })))
}

/// Called on every sign-in; repeats for the same email are no-ops.
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<NewUser>,
) -> ApiResult<Json<CreateOutcome>> {
    Ok(Json(state.store.insert_user(user).await?))
}

pub async fn promote_user(
    AdminContext(admin): AdminContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UpdateOutcome>> {
    let outcome = state.store.promote_to_admin(&id).await?;
    tracing::info!(user_id = %id, by = ?admin.email(), matched = outcome.matched_count, "promoted user to admin");
    Ok(Json(outcome))
}

pub async fn delete_user(
    _admin: AdminContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    Ok(Json(state.store.delete_user(&id).await?))
}
