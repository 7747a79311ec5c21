//! Session and token lifecycle: start, refresh (rotation with replay
//! detection), close, and access-token verification.
//!
//! The engine keeps no mutable state of its own. Everything shared lives in
//! the [`Storage`] backend, and every multi-step write runs in one
//! transaction.

use chrono::{Duration, Utc};
use serde::Serialize;
use jwtauth_core::types::{RefreshTokenId, SessionId, UserId};
use jwtauth_db::models::refresh_token::NewRefreshToken;
use jwtauth_db::models::session::{NewSession, UNKNOWN_USER_AGENT};
use jwtauth_db::{RefreshTokenStore, SessionStore, Storage, StoreError, Transaction};

use crate::auth::jwt::{AccessTokenPayload, RefreshTokenPayload, TokenCodec, TokenError};

/// Lifetimes applied by the engine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_token_ttl: Duration,
    /// Lifetime of each persisted refresh token row.
    pub refresh_token_ttl: Duration,
    /// Fixed lifetime of a session, counted from its creation.
    pub session_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::hours(1),
            session_ttl: Duration::days(30),
        }
    }
}

/// Token pair handed to a client after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity proven by a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAccess {
    pub user_id: UserId,
    pub session_id: SessionId,
    /// Expiration time of the access token (UTC Unix timestamp).
    pub expires_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Access token expired")]
    ExpiredToken,

    #[error("Refresh token expired")]
    ExpiredRefreshToken,

    #[error("Session expired")]
    ExpiredSession,

    /// Also returned when a session was revoked for suspected token reuse.
    #[error("Unknown refresh token")]
    UnknownRefreshToken,

    #[error("Unknown session")]
    UnknownSession,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl SessionError {
    /// Whether the error is the caller's fault (bad, stale, or revoked
    /// credentials) rather than a failure of this service.
    pub fn is_unauthorized(&self) -> bool {
        !matches!(self, SessionError::Storage(_) | SessionError::Signing(_))
    }
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => SessionError::InvalidSignature,
            TokenError::Expired => SessionError::ExpiredToken,
            TokenError::Malformed(_) => SessionError::MalformedToken,
            TokenError::Key(msg) | TokenError::Signing(msg) => SessionError::Signing(msg),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Orchestrates the token codec and the session / refresh token stores.
pub struct SessionEngine<S: Storage> {
    storage: S,
    codec: TokenCodec,
    config: SessionConfig,
}

impl<S: Storage> SessionEngine<S> {
    pub fn new(storage: S, codec: TokenCodec, config: SessionConfig) -> Self {
        Self {
            storage,
            codec,
            config,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a session for an authenticated user and issue its first token
    /// pair, atomically.
    pub async fn start_session(
        &self,
        user_id: &str,
        user_agent: Option<&str>,
        source_address: Option<&str>,
    ) -> SessionResult<TokenPair> {
        let result: SessionResult<TokenPair> = async {
            let mut tx = self.storage.begin().await?;
            let tokens = self
                .start_session_in(&mut tx, user_id, user_agent, source_address)
                .await?;
            tx.commit().await?;
            Ok(tokens)
        }
        .await;

        result.inspect_err(|e| tracing::error!(error = %e, user_id, "Failed to start session"))
    }

    /// Like [`Self::start_session`], but inside a transaction owned by the
    /// caller (e.g. one that also inserts the user row). Nothing is persisted
    /// until the caller commits.
    pub async fn start_session_in<T>(
        &self,
        tx: &mut T,
        user_id: &str,
        user_agent: Option<&str>,
        source_address: Option<&str>,
    ) -> SessionResult<TokenPair>
    where
        T: SessionStore + RefreshTokenStore,
    {
        let now = Utc::now();
        let session = tx
            .insert_session(&NewSession {
                session_id: SessionId::new(),
                user_id: user_id.to_string(),
                user_agent: user_agent.unwrap_or(UNKNOWN_USER_AGENT).to_string(),
                source_address: source_address.map(str::to_owned),
                created_at: now,
                expires_at: now + self.config.session_ttl,
            })
            .await?;

        tracing::info!(user_id, session_id = %session.session_id, "Session started");

        self.issue_tokens(tx, user_id, session.session_id).await
    }

    /// Sign a fresh token pair and persist the refresh token row in `tx`.
    async fn issue_tokens<T>(
        &self,
        tx: &mut T,
        user_id: &str,
        session_id: SessionId,
    ) -> SessionResult<TokenPair>
    where
        T: RefreshTokenStore,
    {
        let access_token = self.codec.sign_access(
            &AccessTokenPayload {
                user_id: user_id.to_string(),
                session_id,
            },
            self.config.access_token_ttl,
        )?;

        let refresh_token_id = RefreshTokenId::new();
        let refresh_token = self.codec.sign_refresh(&RefreshTokenPayload {
            user_id: user_id.to_string(),
            session_id,
            refresh_token_id,
        })?;

        let now = Utc::now();
        tx.insert_refresh_token(&NewRefreshToken {
            refresh_token_id,
            session_id,
            created_at: now,
            expires_at: now + self.config.refresh_token_ttl,
        })
        .await?;

        tracing::debug!(user_id, %session_id, %refresh_token_id, "Tokens issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Redeem a refresh token for a new token pair.
    ///
    /// The presented token is consumed: a second redemption fails with
    /// [`SessionError::UnknownRefreshToken`]. If the token is unknown and the
    /// request comes from a different network than the one recorded on the
    /// session, the session is revoked.
    pub async fn refresh_tokens(
        &self,
        refresh_token: &str,
        source_address: Option<&str>,
    ) -> SessionResult<TokenPair> {
        self.rotate(refresh_token, source_address)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Token refresh failed"))
    }

    async fn rotate(
        &self,
        refresh_token: &str,
        source_address: Option<&str>,
    ) -> SessionResult<TokenPair> {
        let RefreshTokenPayload {
            user_id,
            session_id,
            refresh_token_id,
        } = self.codec.verify_refresh(refresh_token)?.payload;

        // Lock-free reads ahead of the transaction.
        let mut conn = self.storage.connect().await?;
        let record = conn.find_refresh_token(refresh_token_id).await?;
        let session = conn.find_session(session_id, &user_id).await?;

        let Some(record) = record else {
            if let Some(session) = &session {
                let moved = session
                    .source_address
                    .as_deref()
                    .is_some_and(|recorded| Some(recorded) != source_address);
                if moved {
                    tracing::warn!(
                        user_id = %user_id,
                        %session_id,
                        recorded_address = ?session.source_address,
                        presented_address = ?source_address,
                        "Redeemed refresh token replayed from a different address, revoking session"
                    );
                    conn.delete_session(session_id).await?;
                }
            }
            return Err(SessionError::UnknownRefreshToken);
        };

        let now = Utc::now();
        if record.expires_at <= now {
            return Err(SessionError::ExpiredRefreshToken);
        }
        let Some(session) = session else {
            // The session was revoked or closed; this row can never be redeemed.
            conn.delete_refresh_token(refresh_token_id).await?;
            tracing::info!(
                user_id = %user_id,
                %session_id,
                "Dropped refresh token of a removed session"
            );
            return Err(SessionError::UnknownSession);
        };
        if session.expires_at <= now {
            return Err(SessionError::ExpiredSession);
        }

        // Dropping `tx` on any early return below rolls the rotation back.
        let mut tx = self.storage.begin().await?;

        if !tx.delete_refresh_token(refresh_token_id).await? {
            // A concurrent refresh redeemed it first.
            return Err(SessionError::UnknownRefreshToken);
        }
        if !tx
            .patch_session_source(session_id, &user_id, source_address)
            .await?
        {
            return Err(SessionError::UnknownSession);
        }
        let tokens = self.issue_tokens(&mut tx, &user_id, session_id).await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, %session_id, "Tokens refreshed");
        Ok(tokens)
    }

    /// End the session a refresh token belongs to. Closing an already closed
    /// session is a no-op.
    pub async fn close_session(&self, refresh_token: &str) -> SessionResult<()> {
        let result: SessionResult<()> = async {
            let payload = self.codec.verify_refresh(refresh_token)?.payload;

            let mut tx = self.storage.begin().await?;
            match tx.find_refresh_token(payload.refresh_token_id).await? {
                Some(record) => {
                    tx.delete_session(record.session_id).await?;
                    // Session deletion does not cascade; consume the presented token too.
                    tx.delete_refresh_token(record.refresh_token_id).await?;
                    tx.commit().await?;
                    tracing::info!(
                        user_id = %payload.user_id,
                        session_id = %record.session_id,
                        "Session closed"
                    );
                }
                None => {
                    tracing::info!(
                        session_id = %payload.session_id,
                        "Refresh token already gone, nothing to close"
                    );
                }
            }
            Ok(())
        }
        .await;

        result.inspect_err(|e| tracing::warn!(error = %e, "Failed to close session"))
    }

    /// Check an access token's signature and expiry. Touches no storage, so a
    /// revoked session's access tokens stay valid until they expire.
    pub fn verify_access_token(&self, access_token: &str) -> SessionResult<VerifiedAccess> {
        let claims = self
            .codec
            .verify_access(access_token)
            .inspect_err(|e| tracing::debug!(error = %e, "Access token rejected"))?;

        Ok(VerifiedAccess {
            user_id: claims.payload.user_id,
            session_id: claims.payload.session_id,
            expires_at: claims.exp.unwrap_or(claims.iat),
        })
    }
}
