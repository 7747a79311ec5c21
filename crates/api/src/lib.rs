pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use jwtauth_db::Storage;

use state::AppState;

/// Assemble the full application router (health at the root, API under
/// `/api/v1`) without transport layers.
pub fn app<S: Storage>(state: AppState<S>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .with_state(state)
}
