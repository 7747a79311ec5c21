//! Handlers for the `/auth` resource (signup, login, refresh, logout, me).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use jwtauth_core::identity::split_user_id;
use jwtauth_core::types::{SessionId, UserId};
use jwtauth_db::Storage;

use crate::auth::identity::{self, ClientInfo, Credentials, SignedIn};
use crate::auth::session::TokenPair;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh` and `POST /auth/logout`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by signup and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user_id: UserId,
    pub display_name: Option<String>,
}

/// Response of `POST /auth/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Response of `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: UserId,
    pub identity: String,
    pub session_id: SessionId,
    /// Access token expiry (UTC Unix timestamp).
    pub expires_at: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/signup
///
/// Register a local account and return the tokens of its first session.
pub async fn signup<S: Storage>(
    State(state): State<AppState<S>>,
    client: ClientInfo,
    Json(input): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let signed_in = identity::sign_up(
        &state.engine,
        &input.login,
        input.display_name.as_deref(),
        &input.password,
        &client,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(auth_response(&state, signed_in))))
}

/// POST /api/v1/auth/login
///
/// Authenticate with login + password. Returns access and refresh tokens.
pub async fn login<S: Storage>(
    State(state): State<AppState<S>>,
    client: ClientInfo,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let credentials = Credentials::Password {
        login: input.login,
        password: input.password,
    };
    let signed_in =
        identity::sign_in(&state.engine, &*state.local_provider, &credentials, &client).await?;

    Ok(Json(auth_response(&state, signed_in)))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new pair. The presented token is consumed.
pub async fn refresh<S: Storage>(
    State(state): State<AppState<S>>,
    client: ClientInfo,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let TokenPair {
        access_token,
        refresh_token,
    } = state
        .engine
        .refresh_tokens(&input.refresh_token, client.source_address.as_deref())
        .await?;

    Ok(Json(RefreshResponse {
        access_token,
        refresh_token,
        expires_in: expires_in(&state),
    }))
}

/// POST /api/v1/auth/logout
///
/// End the session the refresh token belongs to. Returns 204 No Content,
/// also when the token was already consumed.
pub async fn logout<S: Storage>(
    State(state): State<AppState<S>>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<StatusCode> {
    state.engine.close_session(&input.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(auth_user: AuthUser) -> AppResult<Json<MeResponse>> {
    let (identity, _) = split_user_id(&auth_user.user_id)?;

    Ok(Json(MeResponse {
        identity: identity.to_string(),
        user_id: auth_user.user_id,
        session_id: auth_user.session_id,
        expires_at: auth_user.expires_at,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn expires_in<S: Storage>(state: &AppState<S>) -> i64 {
    state.engine.config().access_token_ttl.num_seconds()
}

fn auth_response<S: Storage>(state: &AppState<S>, signed_in: SignedIn) -> AuthResponse {
    AuthResponse {
        access_token: signed_in.tokens.access_token,
        refresh_token: signed_in.tokens.refresh_token,
        expires_in: expires_in(state),
        user_id: signed_in.principal.user_id,
        display_name: signed_in.principal.display_name,
    }
}
