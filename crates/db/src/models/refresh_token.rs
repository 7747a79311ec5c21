//! Refresh token model and DTOs.

use sqlx::FromRow;
use uuid::Uuid;
use jwtauth_core::types::{RefreshTokenId, SessionId, Timestamp};

/// A row from the `refresh_tokens` table.
///
/// A row exists only while its token is unredeemed: refreshing deletes it.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    #[sqlx(try_from = "Uuid")]
    pub refresh_token_id: RefreshTokenId,
    #[sqlx(try_from = "Uuid")]
    pub session_id: SessionId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// DTO for creating a new refresh token row.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub refresh_token_id: RefreshTokenId,
    pub session_id: SessionId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}
