//! Signing and verification of access and refresh tokens.
//!
//! Both kinds are RS256-signed JWTs. Access tokens carry an `exp` claim;
//! refresh tokens do not, their lifetime lives in the `refresh_tokens` table.
//! Every token carries a `typ` claim and a kind-specific payload shape, so a
//! refresh token never verifies as an access token or the other way round,
//! even when both kinds share one key pair.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use jwtauth_core::types::{RefreshTokenId, SessionId, UserId};

/// Signature algorithm for every token this service issues.
pub const ALGORITHM: Algorithm = Algorithm::RS256;

/// Discriminates the two token kinds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// A payload that can be embedded in a signed token.
pub trait TokenPayload: Serialize + DeserializeOwned + Clone {
    const KIND: TokenKind;
}

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenPayload {
    #[serde(rename = "sub")]
    pub user_id: UserId,
    #[serde(rename = "sid")]
    pub session_id: SessionId,
}

impl TokenPayload for AccessTokenPayload {
    const KIND: TokenKind = TokenKind::Access;
}

/// Payload of a refresh token. `refresh_token_id` keys the persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenPayload {
    #[serde(rename = "sub")]
    pub user_id: UserId,
    #[serde(rename = "sid")]
    pub session_id: SessionId,
    #[serde(rename = "rti")]
    pub refresh_token_id: RefreshTokenId,
}

impl TokenPayload for RefreshTokenPayload {
    const KIND: TokenKind = TokenKind::Refresh;
}

/// Full claim set: payload plus registered claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims<T> {
    #[serde(flatten)]
    pub payload: T,
    pub typ: TokenKind,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp). Absent on refresh tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature does not match")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Invalid key material: {0}")]
    Key(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// A parsed RSA key pair.
pub struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Parse a PEM-encoded RSA private key (PKCS#1 or PKCS#8) and its public key.
    pub fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, TokenError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| TokenError::Key(format!("private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| TokenError::Key(format!("public key: {e}")))?;
        Ok(Self { encoding, decoding })
    }
}

/// Sign `payload`, adding `iat` and, when `ttl` is given, `exp`.
pub fn sign<T: TokenPayload>(
    payload: &T,
    key: &EncodingKey,
    ttl: Option<Duration>,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        payload: payload.clone(),
        typ: T::KIND,
        iat: now.timestamp(),
        exp: ttl.map(|ttl| (now + ttl).timestamp()),
    };

    encode(&Header::new(ALGORITHM), &claims, key).map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verify a token's signature and decode its claims. Pure: no I/O.
///
/// Rejects expired tokens, tokens of the other kind, and access tokens
/// without an `exp` claim.
pub fn verify<T: TokenPayload>(token: &str, key: &DecodingKey) -> Result<Claims<T>, TokenError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.required_spec_claims = HashSet::new();
    if T::KIND == TokenKind::Access {
        validation.set_required_spec_claims(&["exp"]);
    }

    let claims = decode::<Claims<T>>(token, key, &validation)?.claims;
    if claims.typ != T::KIND {
        return Err(TokenError::Malformed(format!(
            "expected a {:?} token, got {:?}",
            T::KIND,
            claims.typ
        )));
    }
    Ok(claims)
}

/// Stateless codec holding the key material for both token kinds.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct TokenCodec {
    access: Arc<KeyPair>,
    refresh: Arc<KeyPair>,
}

impl TokenCodec {
    /// Use separate key pairs for access and refresh tokens.
    pub fn new(access: KeyPair, refresh: KeyPair) -> Self {
        Self {
            access: Arc::new(access),
            refresh: Arc::new(refresh),
        }
    }

    /// Use one key pair for both token kinds.
    pub fn shared(keys: KeyPair) -> Self {
        let keys = Arc::new(keys);
        Self {
            access: Arc::clone(&keys),
            refresh: keys,
        }
    }

    pub fn sign_access(
        &self,
        payload: &AccessTokenPayload,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        sign(payload, &self.access.encoding, Some(ttl))
    }

    pub fn sign_refresh(&self, payload: &RefreshTokenPayload) -> Result<String, TokenError> {
        sign(payload, &self.refresh.encoding, None)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims<AccessTokenPayload>, TokenError> {
        verify(token, &self.access.decoding)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims<RefreshTokenPayload>, TokenError> {
        verify(token, &self.refresh.decoding)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
