//! In-process implementation of the storage interfaces.
//!
//! All tables sit behind one async mutex. Autocommit calls lock it for the
//! duration of a single call. A transaction holds the lock from
//! [`Storage::begin`] until it is committed or dropped and works on a private
//! copy of the tables, so transactions are serialisable and a dropped
//! transaction leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use jwtauth_core::types::{RefreshTokenId, SessionId, UserId};

use crate::error::{StoreError, StoreResult, DEFAULT_QUERY_TIMEOUT};
use crate::models::refresh_token::{NewRefreshToken, RefreshToken};
use crate::models::session::{NewSession, Session};
use crate::models::user::{ExternalUser, NewUser, User};
use crate::store::{RefreshTokenStore, SessionStore, Storage, Transaction, UserStore};

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<UserId, User>,
    sessions: HashMap<SessionId, Session>,
    refresh_tokens: HashMap<RefreshTokenId, RefreshToken>,
}

impl Tables {
    fn insert_session(&mut self, input: &NewSession) -> StoreResult<Session> {
        if self.sessions.contains_key(&input.session_id) {
            return Err(StoreError::Conflict(format!(
                "session {} already exists",
                input.session_id
            )));
        }
        let session = Session {
            session_id: input.session_id,
            user_id: input.user_id.clone(),
            user_agent: input.user_agent.clone(),
            source_address: input.source_address.clone(),
            created_at: input.created_at,
            updated_at: input.created_at,
            expires_at: input.expires_at,
        };
        self.sessions.insert(session.session_id, session.clone());
        Ok(session)
    }

    fn find_session(&self, session_id: SessionId, user_id: &str) -> Option<Session> {
        self.sessions
            .get(&session_id)
            .filter(|s| s.user_id == user_id)
            .cloned()
    }

    fn patch_session_source(
        &mut self,
        session_id: SessionId,
        user_id: &str,
        source_address: Option<&str>,
    ) -> bool {
        match self
            .sessions
            .get_mut(&session_id)
            .filter(|s| s.user_id == user_id)
        {
            Some(session) => {
                session.source_address = source_address.map(str::to_owned);
                session.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    fn delete_session(&mut self, session_id: SessionId) -> bool {
        self.sessions.remove(&session_id).is_some()
    }

    fn insert_refresh_token(&mut self, input: &NewRefreshToken) -> StoreResult<RefreshToken> {
        if self.refresh_tokens.contains_key(&input.refresh_token_id) {
            return Err(StoreError::Conflict(format!(
                "refresh token {} already exists",
                input.refresh_token_id
            )));
        }
        let token = RefreshToken {
            refresh_token_id: input.refresh_token_id,
            session_id: input.session_id,
            created_at: input.created_at,
            expires_at: input.expires_at,
        };
        self.refresh_tokens
            .insert(token.refresh_token_id, token.clone());
        Ok(token)
    }

    fn insert_user(&mut self, input: &NewUser) -> StoreResult<User> {
        if self.users.contains_key(&input.user_id) {
            return Err(StoreError::Conflict(format!(
                "user {} already exists",
                input.user_id
            )));
        }
        if self
            .users
            .values()
            .any(|u| u.login.as_deref() == Some(input.login.as_str()))
        {
            return Err(StoreError::Conflict(format!(
                "login {} already taken",
                input.login
            )));
        }
        let now = Utc::now();
        let user = User {
            user_id: input.user_id.clone(),
            login: Some(input.login.clone()),
            display_name: input.display_name.clone(),
            password_hash: Some(input.password_hash.clone()),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    fn find_local_user(&self, login: &str) -> Option<User> {
        self.users
            .values()
            .find(|u| u.login.as_deref() == Some(login) && u.password_hash.is_some())
            .cloned()
    }

    fn upsert_external_user(&mut self, input: &ExternalUser) -> User {
        let now = Utc::now();
        let user = self
            .users
            .entry(input.user_id.clone())
            .and_modify(|u| {
                u.display_name = input.display_name.clone();
                u.updated_at = now;
            })
            .or_insert_with(|| User {
                user_id: input.user_id.clone(),
                login: None,
                display_name: input.display_name.clone(),
                password_hash: None,
                created_at: now,
                updated_at: now,
            });
        user.clone()
    }
}

/// [`Storage`] keeping every table in process memory.
///
/// Clones share the same tables. Waiting for the lock counts against the
/// per-call timeout, so a stuck transaction surfaces as
/// [`StoreError::Timeout`] like a stalled database would.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    tables: Arc<Mutex<Tables>>,
    query_timeout: Duration,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-call timeout. The returned handle shares the tables.
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Committed refresh token rows belonging to `session_id`.
    pub async fn refresh_tokens_for(&self, session_id: SessionId) -> Vec<RefreshToken> {
        self.tables
            .lock()
            .await
            .refresh_tokens
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Committed session row, regardless of owner.
    pub async fn session(&self, session_id: SessionId) -> Option<Session> {
        self.tables.lock().await.sessions.get(&session_id).cloned()
    }

    /// Number of committed sessions.
    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }
}

/// Autocommit handle for [`MemoryStorage`].
#[derive(Debug)]
pub struct MemoryConn {
    tables: Arc<Mutex<Tables>>,
    query_timeout: Duration,
}

impl MemoryConn {
    async fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        lock_within(self.query_timeout, self.tables.lock()).await
    }
}

async fn lock_within<G>(
    duration: Duration,
    acquire: impl std::future::Future<Output = G>,
) -> StoreResult<G> {
    tokio::time::timeout(duration, acquire).await.map_err(|_| {
        tracing::warn!(timeout_ms = duration.as_millis() as u64, "Storage lock timed out");
        StoreError::Timeout(duration)
    })
}

/// Transaction handle for [`MemoryStorage`].
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl Storage for MemoryStorage {
    type Conn = MemoryConn;
    type Tx = MemoryTx;

    async fn connect(&self) -> StoreResult<MemoryConn> {
        Ok(MemoryConn {
            tables: Arc::clone(&self.tables),
            query_timeout: self.query_timeout,
        })
    }

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let guard = lock_within(
            self.query_timeout,
            Arc::clone(&self.tables).lock_owned(),
        )
        .await?;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn commit(mut self) -> StoreResult<()> {
        *self.guard = self.working;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryConn {
    async fn insert_session(&mut self, input: &NewSession) -> StoreResult<Session> {
        self.lock().await?.insert_session(input)
    }

    async fn find_session(
        &mut self,
        session_id: SessionId,
        user_id: &str,
    ) -> StoreResult<Option<Session>> {
        Ok(self.lock().await?.find_session(session_id, user_id))
    }

    async fn patch_session_source(
        &mut self,
        session_id: SessionId,
        user_id: &str,
        source_address: Option<&str>,
    ) -> StoreResult<bool> {
        Ok(self
            .lock()
            .await?
            .patch_session_source(session_id, user_id, source_address))
    }

    async fn delete_session(&mut self, session_id: SessionId) -> StoreResult<bool> {
        Ok(self.lock().await?.delete_session(session_id))
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryConn {
    async fn insert_refresh_token(
        &mut self,
        input: &NewRefreshToken,
    ) -> StoreResult<RefreshToken> {
        self.lock().await?.insert_refresh_token(input)
    }

    async fn find_refresh_token(
        &mut self,
        id: RefreshTokenId,
    ) -> StoreResult<Option<RefreshToken>> {
        Ok(self.lock().await?.refresh_tokens.get(&id).cloned())
    }

    async fn delete_refresh_token(&mut self, id: RefreshTokenId) -> StoreResult<bool> {
        Ok(self.lock().await?.refresh_tokens.remove(&id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryConn {
    async fn insert_user(&mut self, input: &NewUser) -> StoreResult<User> {
        self.lock().await?.insert_user(input)
    }

    async fn find_local_user(&mut self, login: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().await?.find_local_user(login))
    }

    async fn upsert_external_user(&mut self, input: &ExternalUser) -> StoreResult<User> {
        Ok(self.lock().await?.upsert_external_user(input))
    }
}

#[async_trait]
impl SessionStore for MemoryTx {
    async fn insert_session(&mut self, input: &NewSession) -> StoreResult<Session> {
        self.working.insert_session(input)
    }

    async fn find_session(
        &mut self,
        session_id: SessionId,
        user_id: &str,
    ) -> StoreResult<Option<Session>> {
        Ok(self.working.find_session(session_id, user_id))
    }

    async fn patch_session_source(
        &mut self,
        session_id: SessionId,
        user_id: &str,
        source_address: Option<&str>,
    ) -> StoreResult<bool> {
        Ok(self
            .working
            .patch_session_source(session_id, user_id, source_address))
    }

    async fn delete_session(&mut self, session_id: SessionId) -> StoreResult<bool> {
        Ok(self.working.delete_session(session_id))
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryTx {
    async fn insert_refresh_token(
        &mut self,
        input: &NewRefreshToken,
    ) -> StoreResult<RefreshToken> {
        self.working.insert_refresh_token(input)
    }

    async fn find_refresh_token(
        &mut self,
        id: RefreshTokenId,
    ) -> StoreResult<Option<RefreshToken>> {
        Ok(self.working.refresh_tokens.get(&id).cloned())
    }

    async fn delete_refresh_token(&mut self, id: RefreshTokenId) -> StoreResult<bool> {
        Ok(self.working.refresh_tokens.remove(&id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryTx {
    async fn insert_user(&mut self, input: &NewUser) -> StoreResult<User> {
        self.working.insert_user(input)
    }

    async fn find_local_user(&mut self, login: &str) -> StoreResult<Option<User>> {
        Ok(self.working.find_local_user(login))
    }

    async fn upsert_external_user(&mut self, input: &ExternalUser) -> StoreResult<User> {
        Ok(self.working.upsert_external_user(input))
    }
}
