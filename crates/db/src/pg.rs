//! PostgreSQL implementation of the storage interfaces.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use jwtauth_core::types::{RefreshTokenId, SessionId};

use crate::error::{with_timeout, StoreResult, DEFAULT_QUERY_TIMEOUT};
use crate::models::refresh_token::{NewRefreshToken, RefreshToken};
use crate::models::session::{NewSession, Session};
use crate::models::user::{ExternalUser, NewUser, User};
use crate::repositories::{RefreshTokenRepo, SessionRepo, UserRepo};
use crate::store::{RefreshTokenStore, SessionStore, Storage, Transaction, UserStore};

/// [`Storage`] backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-call query timeout.
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Autocommit handle: each call runs on whichever pooled connection is free.
#[derive(Debug)]
pub struct PgConn {
    pool: PgPool,
    query_timeout: Duration,
}

/// Transaction handle. Dropping it without [`Transaction::commit`] rolls back.
#[derive(Debug)]
pub struct PgTx {
    tx: sqlx::Transaction<'static, Postgres>,
    query_timeout: Duration,
}

#[async_trait]
impl Storage for PgStorage {
    type Conn = PgConn;
    type Tx = PgTx;

    async fn connect(&self) -> StoreResult<PgConn> {
        Ok(PgConn {
            pool: self.pool.clone(),
            query_timeout: self.query_timeout,
        })
    }

    async fn begin(&self) -> StoreResult<PgTx> {
        let tx = with_timeout(self.query_timeout, self.pool.begin()).await?;
        Ok(PgTx {
            tx,
            query_timeout: self.query_timeout,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        with_timeout(self.query_timeout, crate::health_check(&self.pool)).await
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn commit(self) -> StoreResult<()> {
        with_timeout(self.query_timeout, self.tx.commit()).await
    }
}

/// Implements the store traits for a handle, given how to borrow an executor
/// from it.
macro_rules! impl_pg_stores {
    ($handle:ty, $this:ident => $executor:expr) => {
        #[async_trait]
        impl SessionStore for $handle {
            async fn insert_session(&mut self, input: &NewSession) -> StoreResult<Session> {
                let $this = self;
                with_timeout($this.query_timeout, SessionRepo::create($executor, input)).await
            }

            async fn find_session(
                &mut self,
                session_id: SessionId,
                user_id: &str,
            ) -> StoreResult<Option<Session>> {
                let $this = self;
                with_timeout(
                    $this.query_timeout,
                    SessionRepo::find_by_id_and_user($executor, session_id, user_id),
                )
                .await
            }

            async fn patch_session_source(
                &mut self,
                session_id: SessionId,
                user_id: &str,
                source_address: Option<&str>,
            ) -> StoreResult<bool> {
                let $this = self;
                with_timeout(
                    $this.query_timeout,
                    SessionRepo::update_source_address($executor, session_id, user_id, source_address),
                )
                .await
            }

            async fn delete_session(&mut self, session_id: SessionId) -> StoreResult<bool> {
                let $this = self;
                with_timeout($this.query_timeout, SessionRepo::delete($executor, session_id)).await
            }
        }

        #[async_trait]
        impl RefreshTokenStore for $handle {
            async fn insert_refresh_token(
                &mut self,
                input: &NewRefreshToken,
            ) -> StoreResult<RefreshToken> {
                let $this = self;
                with_timeout($this.query_timeout, RefreshTokenRepo::create($executor, input)).await
            }

            async fn find_refresh_token(
                &mut self,
                id: RefreshTokenId,
            ) -> StoreResult<Option<RefreshToken>> {
                let $this = self;
                with_timeout($this.query_timeout, RefreshTokenRepo::find_by_id($executor, id)).await
            }

            async fn delete_refresh_token(&mut self, id: RefreshTokenId) -> StoreResult<bool> {
                let $this = self;
                with_timeout($this.query_timeout, RefreshTokenRepo::delete($executor, id)).await
            }
        }

        #[async_trait]
        impl UserStore for $handle {
            async fn insert_user(&mut self, input: &NewUser) -> StoreResult<User> {
                let $this = self;
                with_timeout($this.query_timeout, UserRepo::create($executor, input)).await
            }

            async fn find_local_user(&mut self, login: &str) -> StoreResult<Option<User>> {
                let $this = self;
                with_timeout(
                    $this.query_timeout,
                    UserRepo::find_local_by_login($executor, login),
                )
                .await
            }

            async fn upsert_external_user(&mut self, input: &ExternalUser) -> StoreResult<User> {
                let $this = self;
                with_timeout($this.query_timeout, UserRepo::upsert_external($executor, input)).await
            }
        }
    };
}

impl_pg_stores!(PgConn, this => &this.pool);
impl_pg_stores!(PgTx, this => &mut *this.tx);
