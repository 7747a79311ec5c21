#![allow(dead_code)]

pub mod faulty;

use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Request, Response, StatusCode};
use axum::Router;
use chrono::Duration as TtlDuration;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use jwtauth_api::auth::identity::ClientInfo;
use jwtauth_api::auth::jwt::{KeyPair, TokenCodec};
use jwtauth_api::auth::session::{SessionConfig, SessionEngine};
use jwtauth_api::state::AppState;
use jwtauth_db::{MemoryStorage, PgStorage};
use sqlx::PgPool;

pub const ACCESS_PRIVATE_PEM: &str = include_str!("../fixtures/access_private.pem");
pub const ACCESS_PUBLIC_PEM: &str = include_str!("../fixtures/access_public.pem");
pub const REFRESH_PRIVATE_PEM: &str = include_str!("../fixtures/refresh_private.pem");
pub const REFRESH_PUBLIC_PEM: &str = include_str!("../fixtures/refresh_public.pem");

/// Codec with separate access and refresh key pairs.
pub fn test_codec() -> TokenCodec {
    let access = KeyPair::from_rsa_pem(ACCESS_PRIVATE_PEM.as_bytes(), ACCESS_PUBLIC_PEM.as_bytes())
        .expect("access fixture keys should parse");
    let refresh =
        KeyPair::from_rsa_pem(REFRESH_PRIVATE_PEM.as_bytes(), REFRESH_PUBLIC_PEM.as_bytes())
            .expect("refresh fixture keys should parse");
    TokenCodec::new(access, refresh)
}

pub fn test_engine(storage: MemoryStorage) -> SessionEngine<MemoryStorage> {
    test_engine_with(storage, SessionConfig::default())
}

pub fn test_engine_with(
    storage: MemoryStorage,
    config: SessionConfig,
) -> SessionEngine<MemoryStorage> {
    SessionEngine::new(storage, test_codec(), config)
}

pub fn client_from(address: &str) -> ClientInfo {
    ClientInfo {
        user_agent: Some("test-agent".to_string()),
        source_address: Some(address.to_string()),
    }
}

/// Engine over a `#[sqlx::test]` database.
pub fn pg_engine(pool: PgPool) -> SessionEngine<PgStorage> {
    SessionEngine::new(PgStorage::new(pool), test_codec(), SessionConfig::default())
}

/// Lifetimes where every stored refresh token is already expired.
pub fn expired_refresh_config() -> SessionConfig {
    SessionConfig {
        refresh_token_ttl: TtlDuration::zero(),
        ..SessionConfig::default()
    }
}

/// Build the application router with the production middleware stack over
/// in-memory storage.
pub fn build_test_app(storage: MemoryStorage) -> Router {
    let state = AppState::new(test_engine(storage));
    let request_id_header = HeaderName::from_static("x-request-id");

    jwtauth_api::app(state)
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_json_from(app, uri, body, None).await
}

/// POST with an `X-Forwarded-For` header naming the client address.
pub async fn post_json_from(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    forwarded_for: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
    if let Some(addr) = forwarded_for {
        builder = builder.header("x-forwarded-for", addr);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
