//! HTTP-level integration tests for the `/auth` endpoints and `/health`.

mod common;

use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use common::{body_json, build_test_app, get, get_auth, post_json, post_json_from};
use jwtauth_db::MemoryStorage;
use serde_json::{json, Value};

const PASSWORD: &str = "correct-horse-battery";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Register `login` through the API and return the JSON response.
async fn signup(app: Router, login: &str, forwarded_for: Option<&str>) -> Value {
    let body = json!({ "login": login, "password": PASSWORD, "display_name": "Alice" });
    let response = post_json_from(app, "/api/v1/auth/signup", body, forwarded_for).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn refresh(app: Router, refresh_token: &str, forwarded_for: Option<&str>) -> Response {
    post_json_from(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
        forwarded_for,
    )
    .await
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().expect("token field").to_string()
}

async fn assert_unauthorized(response: Response) {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "error": "Unauthorized", "code": "UNAUTHORIZED" }));
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_ok() {
    let app = build_test_app(MemoryStorage::new());

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db_healthy"], true);
}

// ---------------------------------------------------------------------------
// Signup / login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_signup_returns_tokens() {
    let app = build_test_app(MemoryStorage::new());

    let body = signup(app, "alice", None).await;

    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["expires_in"], 900);
    assert!(body["user_id"].as_str().unwrap().starts_with("local:"));
    assert_eq!(body["display_name"], "Alice");
}

#[tokio::test]
async fn test_signup_duplicate_login_conflicts() {
    let app = build_test_app(MemoryStorage::new());
    signup(app.clone(), "alice", None).await;

    let body = json!({ "login": "alice", "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/signup", body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn test_signup_short_password_is_rejected() {
    let app = build_test_app(MemoryStorage::new());

    let body = json!({ "login": "alice", "password": "short" });
    let response = post_json(app, "/api/v1/auth/signup", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_success() {
    let app = build_test_app(MemoryStorage::new());
    let registered = signup(app.clone(), "alice", None).await;

    let body = json!({ "login": "alice", "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], registered["user_id"]);
    assert_ne!(body["refresh_token"], registered["refresh_token"]);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = build_test_app(MemoryStorage::new());
    signup(app.clone(), "alice", None).await;

    let body = json!({ "login": "alice", "password": "wrong-password" });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = build_test_app(MemoryStorage::new());
    let registered = signup(app.clone(), "alice", Some("1.2.3.4")).await;
    let original = token(&registered, "refresh_token");

    let response = refresh(app.clone(), &original, Some("1.2.3.4")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_ne!(token(&body, "refresh_token"), original);
    assert_eq!(body["expires_in"], 900);

    assert_unauthorized(refresh(app, &original, Some("1.2.3.4")).await).await;
}

#[tokio::test]
async fn test_refresh_failures_are_indistinguishable() {
    let app = build_test_app(MemoryStorage::new());
    let registered = signup(app.clone(), "alice", Some("1.2.3.4")).await;
    let original = token(&registered, "refresh_token");
    let rotated = body_json(refresh(app.clone(), &original, Some("1.2.3.4")).await).await;

    // Garbage, wrong token kind, consumed token from a new address (revokes
    // the session), and a live token whose session is gone.
    assert_unauthorized(refresh(app.clone(), "garbage", None).await).await;
    assert_unauthorized(refresh(app.clone(), &token(&registered, "access_token"), None).await).await;
    assert_unauthorized(refresh(app.clone(), &original, Some("9.9.9.9")).await).await;
    assert_unauthorized(refresh(app, &token(&rotated, "refresh_token"), Some("1.2.3.4")).await)
        .await;
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_logout_closes_session() {
    let storage = MemoryStorage::new();
    let app = build_test_app(storage.clone());
    let registered = signup(app.clone(), "alice", None).await;
    let refresh_token = token(&registered, "refresh_token");
    let body = json!({ "refresh_token": refresh_token });

    let response = post_json(app.clone(), "/api/v1/auth/logout", body.clone()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(storage.session_count().await, 0);

    let again = post_json(app.clone(), "/api/v1/auth/logout", body).await;
    assert_eq!(again.status(), StatusCode::NO_CONTENT);

    assert_unauthorized(refresh(app, &refresh_token, None).await).await;
}

#[tokio::test]
async fn test_logout_with_bad_token() {
    let app = build_test_app(MemoryStorage::new());

    let body = json!({ "refresh_token": "garbage" });
    assert_unauthorized(post_json(app, "/api/v1/auth/logout", body).await).await;
}

// ---------------------------------------------------------------------------
// Me
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_me_returns_caller() {
    let app = build_test_app(MemoryStorage::new());
    let registered = signup(app.clone(), "alice", None).await;

    let response = get_auth(app, "/api/v1/auth/me", &token(&registered, "access_token")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], registered["user_id"]);
    assert_eq!(body["identity"], "local");
    assert!(body["session_id"].is_string());
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = build_test_app(MemoryStorage::new());

    assert_unauthorized(get(app.clone(), "/api/v1/auth/me").await).await;
    assert_unauthorized(get_auth(app, "/api/v1/auth/me", "garbage").await).await;
}

#[tokio::test]
async fn test_me_rejects_refresh_token() {
    let app = build_test_app(MemoryStorage::new());
    let registered = signup(app.clone(), "alice", None).await;

    let response = get_auth(app, "/api/v1/auth/me", &token(&registered, "refresh_token")).await;
    assert_unauthorized(response).await;
}
