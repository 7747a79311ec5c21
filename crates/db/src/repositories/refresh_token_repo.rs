//! Repository for the `refresh_tokens` table.

use sqlx::PgExecutor;
use jwtauth_core::types::RefreshTokenId;

use crate::models::refresh_token::{NewRefreshToken, RefreshToken};

const COLUMNS: &str = "refresh_token_id, session_id, created_at, expires_at";

/// Provides CRUD operations for refresh tokens.
pub struct RefreshTokenRepo;

impl RefreshTokenRepo {
    /// Insert a new refresh token row, returning it.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewRefreshToken,
    ) -> Result<RefreshToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_tokens (refresh_token_id, session_id, created_at, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(input.refresh_token_id.0)
            .bind(input.session_id.0)
            .bind(input.created_at)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Find a refresh token row by id. Expired rows are returned as-is.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: RefreshTokenId,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE refresh_token_id = $1");
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(id.0)
            .fetch_optional(executor)
            .await
    }

    /// Delete a refresh token row. Returns `true` if this call removed it.
    ///
    /// Under concurrent deletes the row lock lets exactly one caller see
    /// `rows_affected() == 1`.
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        id: RefreshTokenId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE refresh_token_id = $1")
            .bind(id.0)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
