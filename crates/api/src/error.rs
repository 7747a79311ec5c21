use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use jwtauth_core::error::CoreError;

use crate::auth::identity::IdentityError;
use crate::auth::session::SessionError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
/// Token and session failures all render as the same `401` so clients cannot
/// learn which check rejected them.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const UNAUTHORIZED: (StatusCode, &str, &str) =
    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized");

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(_) => unauthorized(),
            },

            AppError::Session(err) => session_status(err),

            AppError::Identity(err) => match err {
                IdentityError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Invalid login or password".to_string(),
                ),
                IdentityError::UnsupportedCredentials(_) | IdentityError::IncompleteProfile(_) => {
                    unauthorized()
                }
                IdentityError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                IdentityError::LoginTaken => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    "User already exists".to_string(),
                ),
                IdentityError::Session(err) => session_status(err),
                IdentityError::Hashing(_) | IdentityError::Storage(_) => internal(&err.to_string()),
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn unauthorized() -> (StatusCode, &'static str, String) {
    let (status, code, message) = UNAUTHORIZED;
    (status, code, message.to_string())
}

fn internal(detail: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn session_status(err: &SessionError) -> (StatusCode, &'static str, String) {
    if err.is_unauthorized() {
        unauthorized()
    } else {
        internal(&err.to_string())
    }
}
