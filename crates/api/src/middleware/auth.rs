//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jwtauth_core::error::CoreError;
use jwtauth_core::types::{SessionId, UserId};
use jwtauth_db::Storage;

use crate::error::AppError;
use crate::state::AppState;

/// Caller proven by the access token in the `Authorization` header.
///
/// Verification is signature and expiry only; no storage is consulted.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub session_id: SessionId,
    /// Access token expiry (UTC Unix timestamp).
    pub expires_at: i64,
}

impl<S: Storage> FromRequestParts<AppState<S>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| CoreError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            CoreError::Unauthorized("Expected: Bearer <token>".into())
        })?;

        let verified = state.engine.verify_access_token(token)?;

        Ok(AuthUser {
            user_id: verified.user_id,
            session_id: verified.session_id,
            expires_at: verified.expires_at,
        })
    }
}
