//! In-process API tests.
//!
//! The app runs against pools that never connect, so every request here is
//! answered before any query: health, auth gates, input validation and rate
//! limiting.

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
};
use oncemore_integration_tests::{json_body, json_request, test_app};
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let response = test_app().oneshot(get("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-42")
        .body(Body::empty())
        .expect("valid request");

    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.headers()["x-request-id"], "edge-42");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let response = test_app().oneshot(get("/health")).await.expect("response");
    let id = response.headers()["x-request-id"]
        .to_str()
        .expect("ascii header");
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = test_app().oneshot(get("/api/nothing")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Auth gates
// ============================================================================

#[tokio::test]
async fn test_cart_requires_login() {
    let response = test_app().oneshot(get("/api/cart")).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Not authenticated.");
}

#[tokio::test]
async fn test_orders_require_login() {
    let request = json_request("POST", "/api/orders", "{}");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_login() {
    let response = test_app().oneshot(get("/api/auth/me")).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_tree_requires_login() {
    for uri in [
        "/api/admin/users",
        "/api/admin/orders",
        "/api/admin/notifications",
        "/api/admin/notifications/stream",
    ] {
        let response = test_app().oneshot(get(uri)).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = json_body(response).await;
        assert_eq!(body["error"], "Not authenticated.", "{uri}");
    }
}

#[tokio::test]
async fn test_product_writes_require_admin() {
    let request = json_request("POST", "/api/products", r#"{"name": "Jacket"}"#);
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/products/1")
        .body(Body::empty())
        .expect("valid request");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_login_requires_both_fields() {
    let request = json_request("POST", "/api/auth/login", r#"{"email": "a@b.in"}"#);
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Email and password are required.");
}

#[tokio::test]
async fn test_register_requires_full_name() {
    let request = json_request(
        "POST",
        "/api/auth/register",
        r#"{"email": "a@b.in", "password": "secret1"}"#,
    );
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Email, password, and full name are required.");
}

#[tokio::test]
async fn test_verify_otp_requires_code() {
    let request = json_request("POST", "/api/auth/verify-otp", r#"{"email": "a@b.in"}"#);
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_a_json_400() {
    let request = json_request("POST", "/api/auth/login", "{not json");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_bad_product_id_is_a_json_400() {
    let response = test_app()
        .oneshot(get("/api/products/not-a-number"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_condition_filter_is_rejected() {
    let response = test_app()
        .oneshot(get("/api/products?condition=mint"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let app = test_app();

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let request = json_request("POST", "/api/auth/login", "{}");
        let response = app.clone().oneshot(request).await.expect("response");
        statuses.push(response.status());
    }

    assert_eq!(statuses.first(), Some(&StatusCode::BAD_REQUEST));
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_the_limit() {
    let app = test_app();

    let mut statuses = Vec::new();
    for hop in 0..8 {
        let mut request = json_request("POST", "/api/auth/verify-otp", "{}");
        request.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_str(&format!("198.51.100.{hop}")).expect("header value"),
        );
        let response = app.clone().oneshot(request).await.expect("response");
        statuses.push(response.status());
    }

    assert_eq!(statuses.first(), Some(&StatusCode::BAD_REQUEST));
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_logout_is_not_rate_limited() {
    let app = test_app();

    for _ in 0..8 {
        let request = json_request("POST", "/api/auth/logout", "");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
