/// Bearer authentication on protected routes
///
/// None of these requests reach a handler, so the pool never connects.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Duration;
use common::{TestApp, ACCESS_SECRET};
use crm_shared::{
    auth::jwt::{create_token, create_token_pair, Claims, JwtKeys, TokenType},
    models::user::UserRole,
};
use serde_json::json;
use uuid::Uuid;

fn access_token(keys: &JwtKeys, expires_in: Duration) -> (String, Claims) {
    let claims = Claims::with_expiration(
        Uuid::new_v4(),
        "ana@example.com",
        UserRole::User,
        TokenType::Access,
        expires_in,
    );
    (create_token(&claims, keys).unwrap(), claims)
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::offline();

    let response = app
        .request(Method::GET, "/api/customers", None, None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body = response.json();
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Missing credentials");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = TestApp::offline();

    let request = Request::builder()
        .uri("/api/leads")
        .header(header::AUTHORIZATION, "Basic YW5hOnNlY3JldA==")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::offline();

    let response = app.get("/api/sales", "not.a.jwt").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = TestApp::offline();
    let (token, _) = access_token(&app.state.keys, Duration::hours(-2));

    let response = app.get("/api/tasks", &token).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["message"], "Token expired");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = TestApp::offline();
    let foreign = JwtKeys::new(
        "some-other-service-access-secret-32b",
        "some-other-service-refresh-secret-32",
    );
    let (token, _) = access_token(&foreign, Duration::hours(1));

    let response = app.get("/api/notifications", &token).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::offline();
    let pair = create_token_pair(
        Uuid::new_v4(),
        "ana@example.com",
        UserRole::User,
        &app.state.keys,
    )
    .unwrap();

    let response = app.get("/api/dashboard/stats", &pair.refresh_token).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_secret_does_not_sign_refresh_tokens() {
    let app = TestApp::offline();

    // A refresh-typed token signed with the access secret
    let keys = JwtKeys::new(ACCESS_SECRET, ACCESS_SECRET);
    let claims = Claims::new(Uuid::new_v4(), "ana@example.com", UserRole::User, TokenType::Refresh);
    let token = create_token(&claims, &keys).unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": token })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoked_token_is_unauthorized() {
    let app = TestApp::offline();
    let (token, claims) = access_token(&app.state.keys, Duration::hours(1));

    app.state.blacklist.revoke(&token, claims.exp).await.unwrap();

    let response = app.get("/api/activities", &token).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["message"], "Token has been revoked");
}

#[tokio::test]
async fn test_short_search_query_is_rejected_before_querying() {
    let app = TestApp::offline();
    let (token, _) = access_token(&app.state.keys, Duration::hours(1));

    let response = app.get("/api/search?q=a", &token).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "bad_request");
}

#[tokio::test]
async fn test_export_rejects_unknown_type_and_reversed_range() {
    let app = TestApp::offline();
    let (token, _) = access_token(&app.state.keys, Duration::hours(1));

    let unknown = app.get("/api/export?type=invoices", &token).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let reversed = app
        .get("/api/export?type=sales&from=2025-03-01&to=2025-01-01", &token)
        .await;
    assert_eq!(reversed.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reversed.json()["details"][0]["field"], "from");
}

#[tokio::test]
async fn test_register_rejects_short_password_before_querying() {
    let app = TestApp::offline();

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ana Souza",
                "email": "ana@example.com",
                "password": "abc",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = TestApp::offline();

    let response = app
        .request(Method::GET, "/api/customers", None, None)
        .await;

    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers.get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_malformed_json_body_uses_error_envelope() {
    let app = TestApp::offline();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "bad_request");
}

#[tokio::test]
async fn test_missing_body_field_uses_error_envelope() {
    let app = TestApp::offline();

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "body");
}

#[tokio::test]
async fn test_invalid_path_id_uses_error_envelope() {
    let app = TestApp::offline();
    let (token, _) = access_token(&app.state.keys, Duration::hours(1));

    let response = app.get("/api/customers/not-a-uuid", &token).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(response.json()["error"], "bad_request");
}

#[tokio::test]
async fn test_unknown_query_enum_uses_error_envelope() {
    let app = TestApp::offline();
    let (token, _) = access_token(&app.state.keys, Duration::hours(1));

    let response = app.get("/api/leads?status=bogus", &token).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("bogus"));
}
