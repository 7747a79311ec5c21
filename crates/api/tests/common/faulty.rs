//! Storage wrapper whose transactions fail when writing refresh tokens, as a
//! database that stalls mid-transaction would.

use std::time::Duration;

use async_trait::async_trait;
use jwtauth_core::types::{RefreshTokenId, SessionId};
use jwtauth_db::memory::{MemoryConn, MemoryTx};
use jwtauth_db::models::refresh_token::{NewRefreshToken, RefreshToken};
use jwtauth_db::models::session::{NewSession, Session};
use jwtauth_db::models::user::{ExternalUser, NewUser, User};
use jwtauth_db::{
    MemoryStorage, RefreshTokenStore, SessionStore, Storage, StoreError, StoreResult, Transaction,
    UserStore,
};

/// Delegates to a [`MemoryStorage`]; every transactional
/// `insert_refresh_token` fails with [`StoreError::Timeout`].
#[derive(Debug, Clone)]
pub struct RefreshInsertTimesOut {
    inner: MemoryStorage,
}

impl RefreshInsertTimesOut {
    pub fn new(inner: MemoryStorage) -> Self {
        Self { inner }
    }
}

pub struct FaultyTx {
    inner: MemoryTx,
}

#[async_trait]
impl Storage for RefreshInsertTimesOut {
    type Conn = MemoryConn;
    type Tx = FaultyTx;

    async fn connect(&self) -> StoreResult<MemoryConn> {
        self.inner.connect().await
    }

    async fn begin(&self) -> StoreResult<FaultyTx> {
        Ok(FaultyTx {
            inner: self.inner.begin().await?,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl Transaction for FaultyTx {
    async fn commit(self) -> StoreResult<()> {
        self.inner.commit().await
    }
}

#[async_trait]
impl SessionStore for FaultyTx {
    async fn insert_session(&mut self, input: &NewSession) -> StoreResult<Session> {
        self.inner.insert_session(input).await
    }

    async fn find_session(
        &mut self,
        session_id: SessionId,
        user_id: &str,
    ) -> StoreResult<Option<Session>> {
        self.inner.find_session(session_id, user_id).await
    }

    async fn patch_session_source(
        &mut self,
        session_id: SessionId,
        user_id: &str,
        source_address: Option<&str>,
    ) -> StoreResult<bool> {
        self.inner
            .patch_session_source(session_id, user_id, source_address)
            .await
    }

    async fn delete_session(&mut self, session_id: SessionId) -> StoreResult<bool> {
        self.inner.delete_session(session_id).await
    }
}

#[async_trait]
impl RefreshTokenStore for FaultyTx {
    async fn insert_refresh_token(
        &mut self,
        _input: &NewRefreshToken,
    ) -> StoreResult<RefreshToken> {
        Err(StoreError::Timeout(Duration::from_secs(20)))
    }

    async fn find_refresh_token(
        &mut self,
        id: RefreshTokenId,
    ) -> StoreResult<Option<RefreshToken>> {
        self.inner.find_refresh_token(id).await
    }

    async fn delete_refresh_token(&mut self, id: RefreshTokenId) -> StoreResult<bool> {
        self.inner.delete_refresh_token(id).await
    }
}

#[async_trait]
impl UserStore for FaultyTx {
    async fn insert_user(&mut self, input: &NewUser) -> StoreResult<User> {
        self.inner.insert_user(input).await
    }

    async fn find_local_user(&mut self, login: &str) -> StoreResult<Option<User>> {
        self.inner.find_local_user(login).await
    }

    async fn upsert_external_user(&mut self, input: &ExternalUser) -> StoreResult<User> {
        self.inner.upsert_external_user(input).await
    }
}
