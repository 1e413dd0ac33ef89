use axum::extract::{Path, State};
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use common_money::to_minor_units;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;
use crate::extract::ApiJson;
use crate::guards::require_self;
use crate::models::{NewPayment, Payment, PaymentReceipt};
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

pub async fn create_payment_intent(
    _auth: AuthContext,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PaymentIntentRequest>,
) -> ApiResult<Json<Value>> {
    let amount = to_minor_units(req.price)
        .map_err(|err| ApiError::bad_request("invalid_price", Some(err.to_string())))?;

    let intent = state
        .gateway
        .create_payment_intent(amount, &state.currency)
        .await
        .map_err(|err| {
            warn!(error = %err, amount, "payment intent creation failed");
            ApiError::gateway(err)
        })?;

    info!(intent_id = %intent.id, amount, currency = %state.currency, "payment intent created");
    Ok(Json(json!({ "clientSecret": intent.client_secret })))
}

pub async fn list_payments(
    auth: AuthContext,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<Payment>>> {
    require_self(&auth, &email)?;
    Ok(Json(state.store.list_payments(&email).await?))
}

/// Stores the payment and clears the cart rows it paid for.
pub async fn record_payment(
    auth: AuthContext,
    State(state): State<AppState>,
    ApiJson(payment): ApiJson<NewPayment>,
) -> ApiResult<Json<PaymentReceipt>> {
    require_self(&auth, &payment.email)?;
    let cart_items = payment.cart_ids.len();

    match state.store.record_payment(payment).await {
        Ok(receipt) => {
            state.metrics.payment_recorded();
            info!(
                payment_id = %receipt.payment_result.inserted_id,
                cart_items,
                removed = receipt.delete_result.deleted_count,
                "payment recorded"
            );
            Ok(Json(receipt))
        }
        Err(err) => {
            if let StoreError::CartCleanup { payment_id, .. } = &err {
                state.metrics.payment_recorded();
                state.metrics.cart_cleanup_failed();
                warn!(%payment_id, "payment kept but cart rows remain");
            }
            Err(err.into())
        }
    }
}
