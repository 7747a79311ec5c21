use std::time::Duration;

use jwtauth_db::Storage;

use crate::auth::identity::{LdapProvider, SamlProvider};
use crate::auth::jwt::{KeyPair, TokenCodec, TokenError};
use crate::auth::session::SessionConfig;

/// Default access token lifetime in seconds (15 minutes).
const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Default refresh token lifetime in seconds (1 hour).
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 60 * 60;
/// Default session lifetime in seconds (30 days).
const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;
/// Upper bound for any configured lifetime (10 years).
const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;
/// Default per-call storage timeout in seconds.
const DEFAULT_DB_QUERY_TIMEOUT_SECS: u64 = 20;

/// Token and session settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub session_ttl_secs: i64,
    /// PEM-encoded RSA private key for signing access tokens.
    pub token_private_key: String,
    /// PEM-encoded RSA public key for verifying access tokens.
    pub token_public_key: String,
    /// Optional separate key pair for refresh tokens. When absent, refresh
    /// tokens use the access token key pair.
    pub refresh_token_keys: Option<(String, String)>,
    /// Identity id prefix for SAML users.
    pub saml_identity_id: String,
    /// Identity id prefix for LDAP users.
    pub ldap_identity_id: String,
}

impl AuthConfig {
    /// Read settings through `lookup` (usually the process environment).
    ///
    /// | Env Var                      | Required | Default   |
    /// |------------------------------|----------|-----------|
    /// | `TOKEN_PRIVATE_KEY`          | **yes**  | --        |
    /// | `TOKEN_PUBLIC_KEY`           | **yes**  | --        |
    /// | `REFRESH_TOKEN_PRIVATE_KEY`  | no       | --        |
    /// | `REFRESH_TOKEN_PUBLIC_KEY`   | no       | --        |
    /// | `ACCESS_TOKEN_TTL_SECS`      | no       | `900`     |
    /// | `REFRESH_TOKEN_TTL_SECS`     | no       | `3600`    |
    /// | `SESSION_TTL_SECS`           | no       | `2592000` |
    /// | `SAML_IDENTITY_ID`           | no       | `saml`    |
    /// | `LDAP_IDENTITY_ID`           | no       | `ldap`    |
    ///
    /// Literal `\n` sequences in key values are expanded to newlines so PEM
    /// blocks fit on one line.
    ///
    /// # Panics
    ///
    /// Panics if a required key is missing, a number does not parse, or a
    /// lifetime is not within `1..=315360000` seconds.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pem = |name: &str| lookup(name).map(|v| v.replace("\\n", "\n"));

        let token_private_key =
            pem("TOKEN_PRIVATE_KEY").expect("TOKEN_PRIVATE_KEY must be set in the environment");
        let token_public_key =
            pem("TOKEN_PUBLIC_KEY").expect("TOKEN_PUBLIC_KEY must be set in the environment");

        let refresh_token_keys = match (
            pem("REFRESH_TOKEN_PRIVATE_KEY"),
            pem("REFRESH_TOKEN_PUBLIC_KEY"),
        ) {
            (Some(private), Some(public)) => Some((private, public)),
            (None, None) => None,
            _ => panic!(
                "REFRESH_TOKEN_PRIVATE_KEY and REFRESH_TOKEN_PUBLIC_KEY must be set together"
            ),
        };

        Self {
            access_token_ttl_secs: ttl_or(
                &lookup,
                "ACCESS_TOKEN_TTL_SECS",
                DEFAULT_ACCESS_TOKEN_TTL_SECS,
            ),
            refresh_token_ttl_secs: ttl_or(
                &lookup,
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            ),
            session_ttl_secs: ttl_or(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS),
            token_private_key,
            token_public_key,
            refresh_token_keys,
            saml_identity_id: lookup("SAML_IDENTITY_ID").unwrap_or_else(|| "saml".into()),
            ldap_identity_id: lookup("LDAP_IDENTITY_ID").unwrap_or_else(|| "ldap".into()),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            access_token_ttl: chrono::Duration::seconds(self.access_token_ttl_secs),
            refresh_token_ttl: chrono::Duration::seconds(self.refresh_token_ttl_secs),
            session_ttl: chrono::Duration::seconds(self.session_ttl_secs),
        }
    }

    /// Parse the configured key material into a codec.
    pub fn token_codec(&self) -> Result<TokenCodec, TokenError> {
        let access = KeyPair::from_rsa_pem(
            self.token_private_key.as_bytes(),
            self.token_public_key.as_bytes(),
        )?;
        match &self.refresh_token_keys {
            Some((private, public)) => Ok(TokenCodec::new(
                access,
                KeyPair::from_rsa_pem(private.as_bytes(), public.as_bytes())?,
            )),
            None => Ok(TokenCodec::shared(access)),
        }
    }

    pub fn saml_provider<S: Storage>(&self, storage: S) -> SamlProvider<S> {
        SamlProvider::new(self.saml_identity_id.clone(), storage)
    }

    pub fn ldap_provider<S: Storage>(&self, storage: S) -> LdapProvider<S> {
        LdapProvider::new(self.ldap_identity_id.clone(), storage)
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Per-call storage timeout (default: 20 seconds).
    pub db_query_timeout: Duration,
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default   |
    /// |-------------------------|-----------|
    /// | `HOST`                  | `0.0.0.0` |
    /// | `PORT`                  | `3000`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`      |
    /// | `DB_QUERY_TIMEOUT_SECS` | `20`      |
    ///
    /// Token settings are described on [`AuthConfig::from_lookup`].
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "PORT", 3000),
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30),
            db_query_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DB_QUERY_TIMEOUT_SECS",
                DEFAULT_DB_QUERY_TIMEOUT_SECS,
            )),
            auth: AuthConfig::from_lookup(&lookup),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid number, got {raw:?}")),
        None => default,
    }
}

/// Like [`parse_or`], for lifetimes in seconds.
fn ttl_or(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: i64) -> i64 {
    let secs = parse_or(lookup, name, default);
    if !(1..=MAX_TTL_SECS).contains(&secs) {
        panic!("{name} must be between 1 and {MAX_TTL_SECS} seconds, got {secs}");
    }
    secs
}
