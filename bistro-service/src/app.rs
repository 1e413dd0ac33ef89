use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use common_auth::{JwtVerifier, TokenIssuer};
use common_http_errors::legacy_status;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth_handlers::issue_token;
use crate::cart_handlers::{add_to_cart, list_cart, remove_from_cart};
use crate::config::DEFAULT_CORS_ORIGIN;
use crate::gateway::PaymentGateway;
use crate::menu_handlers::{
    create_menu_item, delete_menu_item, get_menu_item, list_menu, update_menu_item,
};
use crate::metrics::{metrics_handler, track_errors, ServiceMetrics};
use crate::payment_handlers::{create_payment_intent, list_payments, record_payment};
use crate::review_handlers::list_reviews;
use crate::stats_handlers::{admin_stats, order_stats};
use crate::store::BistroStore;
use crate::user_handlers::{check_admin, create_user, delete_user, list_users, promote_user};

pub const LIVENESS_MESSAGE: &str = "BistroBoss server is running!";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BistroStore>,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub token_issuer: Arc<TokenIssuer>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub metrics: Arc<ServiceMetrics>,
    /// ISO currency code sent with payment intents.
    pub currency: String,
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<TokenIssuer> {
    fn from_ref(state: &AppState) -> Self {
        state.token_issuer.clone()
    }
}

impl FromRef<AppState> for Arc<ServiceMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Outer HTTP behaviour that does not belong in `AppState`.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cors_origins: Vec<String>,
    /// Report non-auth failures with status 200 and the error body.
    pub legacy_error_status: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
            legacy_error_status: true,
        }
    }
}

pub fn build_router(state: AppState, options: &HttpOptions) -> Router {
    let metrics = state.metrics.clone();

    let mut router = Router::new()
        .route("/", get(|| async { LIVENESS_MESSAGE }))
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(metrics_handler))
        .route("/jwt", post(issue_token))
        .route("/users", get(list_users).post(create_user))
        .route("/users/admin/:email", get(check_admin))
        .route("/users/:id", patch(promote_user).delete(delete_user))
        .route("/menu", get(list_menu).post(create_menu_item))
        .route(
            "/menu/:id",
            get(get_menu_item)
                .patch(update_menu_item)
                .delete(delete_menu_item),
        )
        .route("/reviews", get(list_reviews))
        .route("/carts", get(list_cart).post(add_to_cart))
        .route("/carts/:id", axum::routing::delete(remove_from_cart))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payments", post(record_payment))
        .route("/payments/:email", get(list_payments))
        .route("/admin-stats", get(admin_stats))
        .route("/order-stats", get(order_stats))
        .with_state(state)
        .layer(middleware::map_response_with_state(metrics, track_errors));

    if options.legacy_error_status {
        router = router.layer(middleware::map_response(legacy_status));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&options.cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}
