//! Repository for the `sessions` table.

use sqlx::PgExecutor;
use jwtauth_core::types::SessionId;

use crate::models::session::{NewSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "session_id, user_id, user_agent, source_address, \
                       created_at, updated_at, expires_at";

/// Provides CRUD operations for sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewSession,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions
                 (session_id, user_id, user_agent, source_address, created_at, updated_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(input.session_id.0)
            .bind(&input.user_id)
            .bind(&input.user_agent)
            .bind(&input.source_address)
            .bind(input.created_at)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Find a session by id, scoped to its owner.
    pub async fn find_by_id_and_user<'e, E: PgExecutor<'e>>(
        executor: E,
        session_id: SessionId,
        user_id: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE session_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(session_id.0)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Update the recorded source address. Returns `true` if the row was updated.
    pub async fn update_source_address<'e, E: PgExecutor<'e>>(
        executor: E,
        session_id: SessionId,
        user_id: &str,
        source_address: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET source_address = $3, updated_at = NOW()
             WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id.0)
        .bind(user_id)
        .bind(source_address)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a session. Its refresh token rows stay behind and fail later
    /// lookups with no session. Returns `true` if the row existed.
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        session_id: SessionId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id.0)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
