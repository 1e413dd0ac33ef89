use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use common_http_errors::ERROR_CODE_HEADER;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters exported on `/metrics`. Each instance owns its registry so tests
/// can build as many routers as they like.
pub struct ServiceMetrics {
    registry: Registry,
    http_errors: IntCounterVec,
    tokens_issued: IntCounter,
    payments_recorded: IntCounter,
    cart_cleanup_failures: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_errors = IntCounterVec::new(
            Opts::new("bistro_http_errors_total", "Error responses by error code and status"),
            &["code", "status"],
        )?;
        let tokens_issued =
            IntCounter::new("bistro_tokens_issued_total", "Session tokens issued by POST /jwt")?;
        let payments_recorded =
            IntCounter::new("bistro_payments_recorded_total", "Payments written to the store")?;
        let cart_cleanup_failures = IntCounter::new(
            "bistro_cart_cleanup_failures_total",
            "Payments recorded whose cart rows could not be removed",
        )?;

        registry.register(Box::new(http_errors.clone()))?;
        registry.register(Box::new(tokens_issued.clone()))?;
        registry.register(Box::new(payments_recorded.clone()))?;
        registry.register(Box::new(cart_cleanup_failures.clone()))?;

        Ok(Self {
            registry,
            http_errors,
            tokens_issued,
            payments_recorded,
            cart_cleanup_failures,
        })
    }

    pub fn token_issued(&self) {
        self.tokens_issued.inc();
    }

    pub fn payment_recorded(&self) {
        self.payments_recorded.inc();
    }

    pub fn cart_cleanup_failed(&self) {
        self.cart_cleanup_failures.inc();
    }

    pub fn error_count(&self, code: &str, status: u16) -> u64 {
        self.http_errors
            .with_label_values(&[code, &status.to_string()])
            .get()
    }

    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(err) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %err, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    fn observe(&self, response: &Response) {
        if let Some(code) = response
            .headers()
            .get(ERROR_CODE_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.http_errors
                .with_label_values(&[code, response.status().as_str()])
                .inc();
        }
    }
}

/// Response mapper that counts every tagged error before any status rewrite.
pub async fn track_errors(State(metrics): State<Arc<ServiceMetrics>>, response: Response) -> Response {
    metrics.observe(&response);
    response
}

pub async fn metrics_handler(State(metrics): State<Arc<ServiceMetrics>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}
