//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;
use jwtauth_db::Storage;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /signup   -> signup
/// POST /login    -> login
/// POST /refresh  -> refresh
/// POST /logout   -> logout
/// GET  /me       -> me (requires auth)
/// ```
pub fn router<S: Storage>() -> Router<AppState<S>> {
    Router::new()
        .route("/signup", post(auth::signup::<S>))
        .route("/login", post(auth::login::<S>))
        .route("/refresh", post(auth::refresh::<S>))
        .route("/logout", post(auth::logout::<S>))
        .route("/me", get(auth::me))
}
