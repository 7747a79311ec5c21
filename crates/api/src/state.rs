use std::sync::Arc;

use jwtauth_db::Storage;

use crate::auth::identity::LocalProvider;
use crate::auth::session::SessionEngine;

/// Shared application state available to all Axum handlers via `State<AppState<S>>`.
///
/// Generic over the storage backend so tests can run the full router on
/// [`jwtauth_db::MemoryStorage`].
pub struct AppState<S: Storage> {
    pub engine: Arc<SessionEngine<S>>,
    /// Provider behind `POST /auth/login`.
    pub local_provider: Arc<LocalProvider<S>>,
}

impl<S: Storage + Clone> AppState<S> {
    pub fn new(engine: SessionEngine<S>) -> Self {
        let local_provider = LocalProvider::new(engine.storage().clone());
        Self {
            engine: Arc::new(engine),
            local_provider: Arc::new(local_provider),
        }
    }
}

// Manual impl: cloning the state never requires cloning the backend.
impl<S: Storage> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            local_provider: Arc::clone(&self.local_provider),
        }
    }
}
