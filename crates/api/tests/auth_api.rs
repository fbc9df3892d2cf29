//! Authentication gate behavior over HTTP.
//!
//! Every 401 here is produced before any database access, so these run
//! against the lazy pool. The `reason` discriminator in the body is what
//! clients branch on, so each rejection class is pinned down exactly.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{auth_token, build_test_app, expect_failure, send, test_config, MockImages};
use jsonwebtoken::{encode, EncodingKey, Header};

/// Sign claims that expired five minutes ago with the test secret.
fn expired_token() -> String {
    let config = test_config();
    let now = chrono::Utc::now().timestamp();
    let claims = bookhub_api::auth::jwt::Claims {
        sub: 1,
        exp: now - 300,
        iat: now - 600,
        jti: "test-expired-token".to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
    )
    .expect("encoding should succeed")
}

#[tokio::test]
async fn missing_token_is_rejected_with_reason_missing() {
    let app = build_test_app(Arc::new(MockImages::default()));

    let response = send(&app, Method::GET, "/api/books/", None, None).await;
    let json = expect_failure(response, StatusCode::UNAUTHORIZED).await;

    assert_eq!(json["reason"], "missing");
    assert_eq!(json["message"], "No authentication token, access denied");
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected_with_reason_invalid() {
    let app = build_test_app(Arc::new(MockImages::default()));

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/books/")
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request)
        .await
        .unwrap();

    let json = expect_failure(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["reason"], "invalid");
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected_with_reason_invalid() {
    let app = build_test_app(Arc::new(MockImages::default()));

    let response = send(
        &app,
        Method::GET,
        "/api/books/",
        Some("not.a.jwt"),
        None,
    )
    .await;
    let json = expect_failure(response, StatusCode::UNAUTHORIZED).await;

    assert_eq!(json["reason"], "invalid");
    assert_eq!(json["message"], "Token is not valid");
}

#[tokio::test]
async fn expired_token_is_rejected_with_reason_expired() {
    let app = build_test_app(Arc::new(MockImages::default()));

    let token = expired_token();
    let response = send(&app, Method::GET, "/api/books/", Some(&token), None).await;
    let json = expect_failure(response, StatusCode::UNAUTHORIZED).await;

    assert_eq!(json["reason"], "expired");
    assert_eq!(json["message"], "Session expired, please login again");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_invalid() {
    let app = build_test_app(Arc::new(MockImages::default()));

    let other = bookhub_api::auth::jwt::JwtConfig {
        secret: "a-completely-different-secret".to_string(),
        expiry_days: 7,
    };
    let token = bookhub_api::auth::jwt::generate_token(1, &other)
        .expect("token generation should succeed");

    let response = send(&app, Method::GET, "/api/books/", Some(&token), None).await;
    let json = expect_failure(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["reason"], "invalid");
}

#[tokio::test]
async fn refresh_without_header_is_rejected_with_reason_missing() {
    let app = build_test_app(Arc::new(MockImages::default()));

    let response = send(&app, Method::POST, "/api/auth/refresh", None, None).await;
    let json = expect_failure(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["reason"], "missing");
}

#[tokio::test]
async fn valid_token_passes_the_gate() {
    // The feed handler then hits the lazy pool and fails at the database
    // layer, which proves the 401 gate itself accepted the credential.
    let app = build_test_app(Arc::new(MockImages::default()));

    let token = auth_token(7);
    let response = send(&app, Method::GET, "/api/books/", Some(&token), None).await;
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}
