pub mod auth;
pub mod health;

use axum::Router;
use jwtauth_db::Storage;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/signup                                     register local user (public)
/// /auth/login                                      login (public)
/// /auth/refresh                                    rotate tokens (public)
/// /auth/logout                                     close session (public)
/// /auth/me                                         caller identity (requires auth)
/// ```
pub fn api_routes<S: Storage>() -> Router<AppState<S>> {
    Router::new().nest("/auth", auth::router())
}
