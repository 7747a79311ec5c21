//! User session model and DTOs.

use sqlx::FromRow;
use uuid::Uuid;
use jwtauth_core::types::{SessionId, Timestamp, UserId};

/// User agent recorded when the client did not send one.
pub const UNKNOWN_USER_AGENT: &str = "Unknown";

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    #[sqlx(try_from = "Uuid")]
    pub session_id: SessionId,
    pub user_id: UserId,
    pub user_agent: String,
    /// Network origin of the last successful login or refresh.
    pub source_address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Fixed at creation; refreshes never move it.
    pub expires_at: Timestamp,
}

/// DTO for creating a new session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub user_agent: String,
    pub source_address: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}
