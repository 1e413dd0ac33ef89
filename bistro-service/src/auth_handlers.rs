use axum::extract::State;
use axum::Json;
use common_auth::AuthError;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::extract::ApiJson;

/// Signs whatever identity object the client posts; no credential check.
pub async fn issue_token(
    State(state): State<AppState>,
    ApiJson(identity): ApiJson<Value>,
) -> Result<Json<Value>, AuthError> {
    let issued = state.token_issuer.issue(identity)?;
    state.metrics.token_issued();
    Ok(Json(json!({ "token": issued.token })))
}
