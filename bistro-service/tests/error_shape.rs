mod support;

use axum::http::StatusCode;
use bistro_service::store::MenuStore;
use common_http_errors::ERROR_CODE_HEADER;
use support::{request, TestApp};

#[tokio::test]
async fn legacy_mode_reports_faults_with_200_and_a_body() {
    let app = TestApp::new();
    let admin = app.seed_users().await;

    let resp = tower::ServiceExt::oneshot(
        app.router.clone(),
        request("GET", "/menu/not-hex", Some(&admin), None),
    )
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(ERROR_CODE_HEADER).unwrap(), "invalid_id");

    let bytes = axum::body::to_bytes(resp.into_body(), 4096).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "invalid_id");
    assert!(body["message"].as_str().unwrap().contains("not-hex"));
}

#[tokio::test]
async fn strict_mode_keeps_real_statuses() {
    let app = TestApp::strict();
    let (status, body) = app.get("/menu/not-hex", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_id");
}

#[tokio::test]
async fn auth_failures_keep_their_status_in_legacy_mode() {
    let app = TestApp::new();
    let (status, body) = app.get("/admin-stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn errors_are_counted_before_the_status_rewrite() {
    let app = TestApp::new();
    app.get("/menu/not-hex", None).await;
    app.get("/admin-stats", None).await;

    assert_eq!(app.metrics.error_count("invalid_id", 400), 1);
    assert_eq!(app.metrics.error_count("unauthenticated", 401), 1);

    let (status, text) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.as_str().unwrap().contains("bistro_http_errors_total"));
}

#[tokio::test]
async fn liveness_routes_answer() {
    let app = TestApp::new();
    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "BistroBoss server is running!");

    let (status, body) = app.get("/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn malformed_bodies_get_the_error_envelope_in_legacy_mode() {
    let app = TestApp::new();
    let admin = app.seed_users().await;

    let resp = tower::ServiceExt::oneshot(
        app.router.clone(),
        request("POST", "/users", None, Some(serde_json::json!({ "name": "no email" }))),
    )
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(ERROR_CODE_HEADER).unwrap(), "invalid_body");
    let bytes = axum::body::to_bytes(resp.into_body(), 4096).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "invalid_body");
    assert!(body["message"].as_str().unwrap().contains("email"));

    let (status, body) = app
        .post(
            "/menu",
            Some(&admin),
            serde_json::json!({ "name": "Caesar", "category": "salad" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "invalid_body");
    assert!(app.store.list_menu().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests_in_strict_mode() {
    let app = TestApp::strict();
    let guest = app.token_for(support::GUEST_EMAIL);

    let (status, body) = app
        .post("/create-payment-intent", Some(&guest), serde_json::json!({ "price": "ten" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");

    let (status, body) = app
        .send(request("POST", "/jwt", None, Some(serde_json::json!("not json object"))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_claims");

    let (status, body) = app.send(request("POST", "/users", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
    assert_eq!(app.metrics.error_count("invalid_body", 400), 2);
}
