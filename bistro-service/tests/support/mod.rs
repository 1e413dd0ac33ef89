#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bistro_service::gateway::StubGateway;
use bistro_service::metrics::ServiceMetrics;
use bistro_service::models::{NewMenuItem, NewUser};
use bistro_service::store::{InMemoryStore, MenuStore, UserStore};
use bistro_service::{build_router, AppState, HttpOptions};
use common_auth::{JwtConfig, JwtVerifier, TokenIssuer};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "bistro-test-secret";
pub const ADMIN_EMAIL: &str = "admin@bistro.test";
pub const GUEST_EMAIL: &str = "guest@bistro.test";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub metrics: Arc<ServiceMetrics>,
    issuer: TokenIssuer,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(HttpOptions::default())
    }

    /// Router that reports real HTTP statuses for every failure.
    pub fn strict() -> Self {
        Self::with_options(HttpOptions { legacy_error_status: false, ..HttpOptions::default() })
    }

    pub fn with_options(options: HttpOptions) -> Self {
        let config = JwtConfig::new(SECRET);
        let store = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(ServiceMetrics::new().unwrap());
        let state = AppState {
            store: store.clone(),
            jwt_verifier: Arc::new(JwtVerifier::new(config.clone())),
            token_issuer: Arc::new(TokenIssuer::new(config.clone())),
            gateway: Arc::new(StubGateway::new()),
            metrics: metrics.clone(),
            currency: "usd".into(),
        };
        Self {
            router: build_router(state, &options),
            store,
            metrics,
            issuer: TokenIssuer::new(config),
        }
    }

    pub fn token_for(&self, email: &str) -> String {
        self.issuer
            .issue(serde_json::json!({ "email": email }))
            .unwrap()
            .token
    }

    /// Seeds an admin and a regular guest; returns the admin's token.
    pub async fn seed_users(&self) -> String {
        for email in [ADMIN_EMAIL, GUEST_EMAIL] {
            self.store
                .insert_user(NewUser { name: Some("Test".into()), email: email.into(), photo_url: None })
                .await
                .unwrap();
        }
        let admin = self.store.find_user_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
        self.store.promote_to_admin(&admin.id).await.unwrap();
        self.token_for(ADMIN_EMAIL)
    }

    pub async fn seed_dish(&self, name: &str, category: &str, price: f64) -> String {
        let outcome = self
            .store
            .insert_menu_item(NewMenuItem {
                name: name.into(),
                recipe: format!("{name} recipe"),
                image: format!("{name}.jpg"),
                category: category.into(),
                price,
            })
            .await
            .unwrap();
        match outcome {
            bistro_service::models::CreateOutcome::Created(o) => o.inserted_id,
            other => panic!("dish not inserted: {other:?}"),
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 64).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("POST", uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("PATCH", uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("DELETE", uri, token, None)).await
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
