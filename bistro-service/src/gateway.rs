use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a card payment intent for `amount_minor` units of `currency`.
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError>;
}

/// Stripe's PaymentIntents API over plain HTTPS.
pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let amount = amount_minor.to_string();
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("payment_method_types[]", "card"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }

        let intent: IntentResponse = response.json().await?;
        Ok(PaymentIntent { id: intent.id, client_secret: intent.client_secret })
    }
}

/// Used when no provider key is configured; never talks to the network.
#[derive(Default)]
pub struct StubGateway {
    issued: AtomicU64,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("pi_stub_{n}");
        Ok(PaymentIntent {
            client_secret: format!("{id}_secret_{amount_minor}{currency}"),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new(server.base_url(), "sk_test_123", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn stripe_intent_posts_form_and_returns_secret() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/payment_intents")
                    .header("authorization", "Bearer sk_test_123")
                    .body_contains("amount=1999")
                    .body_contains("currency=usd");
                then.status(200).json_body(serde_json::json!({
                    "id": "pi_123",
                    "client_secret": "pi_123_secret_abc",
                    "amount": 1999
                }));
            })
            .await;

        let intent = gateway(&server).create_payment_intent(1999, "usd").await.unwrap();
        mock.assert_async().await;
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_abc");
    }

    #[tokio::test]
    async fn stripe_error_message_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/payment_intents");
                then.status(402).json_body(serde_json::json!({
                    "error": { "message": "Your card was declined." }
                }));
            })
            .await;

        let err = gateway(&server).create_payment_intent(500, "usd").await.unwrap_err();
        match err {
            GatewayError::Rejected { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn stub_secrets_are_distinct() {
        let stub = StubGateway::new();
        let a = stub.create_payment_intent(100, "usd").await.unwrap();
        let b = stub.create_payment_intent(100, "usd").await.unwrap();
        assert_ne!(a.client_secret, b.client_secret);
    }
}
