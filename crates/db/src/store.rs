//! Storage interfaces consumed by the session engine and identity providers.
//!
//! A [`Storage`] hands out two kinds of handles that implement the same
//! store traits:
//!
//! - [`Storage::connect`] -- autocommit; every call stands alone.
//! - [`Storage::begin`] -- a [`Transaction`]; nothing is visible to other
//!   handles until [`Transaction::commit`], and dropping it rolls back.

use async_trait::async_trait;
use jwtauth_core::types::{RefreshTokenId, SessionId};

use crate::error::StoreResult;
use crate::models::refresh_token::{NewRefreshToken, RefreshToken};
use crate::models::session::{NewSession, Session};
use crate::models::user::{ExternalUser, NewUser, User};

/// Durable record of active sessions.
#[async_trait]
pub trait SessionStore: Send {
    async fn insert_session(&mut self, input: &NewSession) -> StoreResult<Session>;

    /// Find a session owned by `user_id`. Expired rows are returned as-is.
    async fn find_session(
        &mut self,
        session_id: SessionId,
        user_id: &str,
    ) -> StoreResult<Option<Session>>;

    /// Record the caller's current network origin. Returns `true` if a row
    /// was updated.
    async fn patch_session_source(
        &mut self,
        session_id: SessionId,
        user_id: &str,
        source_address: Option<&str>,
    ) -> StoreResult<bool>;

    /// Delete a session. Its refresh token rows are left in place until they
    /// are next presented. Returns `true` if the session existed.
    async fn delete_session(&mut self, session_id: SessionId) -> StoreResult<bool>;
}

/// Durable record of unredeemed refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send {
    async fn insert_refresh_token(&mut self, input: &NewRefreshToken)
        -> StoreResult<RefreshToken>;

    async fn find_refresh_token(&mut self, id: RefreshTokenId)
        -> StoreResult<Option<RefreshToken>>;

    /// Returns `true` if this call removed the row. Two racing callers can
    /// never both observe `true`.
    async fn delete_refresh_token(&mut self, id: RefreshTokenId) -> StoreResult<bool>;
}

/// User rows backing the identity providers.
#[async_trait]
pub trait UserStore: Send {
    /// Register a local user. Fails with a conflict if the id or login is taken.
    async fn insert_user(&mut self, input: &NewUser) -> StoreResult<User>;

    async fn find_local_user(&mut self, login: &str) -> StoreResult<Option<User>>;

    /// Insert the user, or refresh its display name if it already exists.
    async fn upsert_external_user(&mut self, input: &ExternalUser) -> StoreResult<User>;
}

/// A unit of work spanning any number of store calls.
#[async_trait]
pub trait Transaction: SessionStore + RefreshTokenStore + UserStore {
    async fn commit(self) -> StoreResult<()>;
}

/// Entry point to a storage backend.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    type Conn: SessionStore + RefreshTokenStore + UserStore;
    type Tx: Transaction;

    async fn connect(&self) -> StoreResult<Self::Conn>;

    async fn begin(&self) -> StoreResult<Self::Tx>;

    /// Cheap liveness check.
    async fn health_check(&self) -> StoreResult<()>;
}
