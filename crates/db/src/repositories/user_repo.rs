//! Repository for the `users` table.

use sqlx::PgExecutor;

use crate::models::user::{ExternalUser, NewUser, User};

const COLUMNS: &str = "user_id, login, display_name, password_hash, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a local user, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (user_id, login, display_name, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.user_id)
            .bind(&input.login)
            .bind(&input.display_name)
            .bind(&input.password_hash)
            .fetch_one(executor)
            .await
    }

    /// Find a user that can sign in with a local password.
    pub async fn find_local_by_login<'e, E: PgExecutor<'e>>(
        executor: E,
        login: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE login = $1 AND password_hash IS NOT NULL"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(executor)
            .await
    }

    /// Insert an externally asserted user or update its display name.
    pub async fn upsert_external<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &ExternalUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (user_id, display_name)
             VALUES ($1, $2)
             ON CONFLICT (user_id)
             DO UPDATE SET display_name = EXCLUDED.display_name, updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.user_id)
            .bind(&input.display_name)
            .fetch_one(executor)
            .await
    }
}
