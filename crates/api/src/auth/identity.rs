//! Identity providers and the sign-in / sign-up flows built on them.
//!
//! Every provider resolves some form of [`Credentials`] to a [`Principal`];
//! sign-in then hands the principal to [`SessionEngine::start_session`].
//! SAML and LDAP protocol handling (assertion signatures, directory binds)
//! happens in the respective client libraries. Their providers receive the
//! already verified profile and only maintain the user row.

use async_trait::async_trait;
use uuid::Uuid;
use jwtauth_core::identity::{combined_user_id, LOCAL_IDENTITY_ID};
use jwtauth_core::types::UserId;
use jwtauth_db::models::user::{ExternalUser, NewUser};
use jwtauth_db::{Storage, StoreError, Transaction, UserStore};

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::session::{SessionEngine, SessionError, TokenPair};

/// Credentials presented to an identity provider.
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { login: String, password: String },
    Saml(SamlProfile),
    Ldap(LdapEntry),
}

impl Credentials {
    fn kind(&self) -> &'static str {
        match self {
            Credentials::Password { .. } => "password",
            Credentials::Saml(_) => "saml",
            Credentials::Ldap(_) => "ldap",
        }
    }
}

/// Attributes of a verified SAML assertion.
#[derive(Debug, Clone)]
pub struct SamlProfile {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Attributes of a directory entry the LDAP bind succeeded for.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    pub uid: String,
    pub given_name: Option<String>,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub display_name: Option<String>,
}

/// What the transport layer knows about the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub source_address: Option<String>,
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub principal: Principal,
    pub tokens: TokenPair,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Provider does not accept {0} credentials")]
    UnsupportedCredentials(&'static str),

    #[error("Identity profile is incomplete: {0}")]
    IncompleteProfile(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Login already taken")]
    LoginTaken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A source of user identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Prefix of the user ids this provider issues.
    fn identity_id(&self) -> &str;

    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, IdentityError>;
}

/// Local login/password accounts.
pub struct LocalProvider<S> {
    storage: S,
}

impl<S: Storage> LocalProvider<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: Storage> IdentityProvider for LocalProvider<S> {
    fn identity_id(&self) -> &str {
        LOCAL_IDENTITY_ID
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, IdentityError> {
        let Credentials::Password { login, password } = credentials else {
            return Err(IdentityError::UnsupportedCredentials(credentials.kind()));
        };

        let mut conn = self.storage.connect().await?;
        let user = conn
            .find_local_user(login)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(IdentityError::InvalidCredentials)?;

        let valid = verify_password(password, hash).map_err(|e| {
            tracing::error!(user_id = %user.user_id, error = %e, "Stored password hash is unusable");
            IdentityError::InvalidCredentials
        })?;
        if !valid {
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(Principal {
            user_id: user.user_id,
            display_name: user.display_name,
        })
    }
}

/// Users asserted by a SAML identity provider.
pub struct SamlProvider<S> {
    identity_id: String,
    storage: S,
}

impl<S: Storage> SamlProvider<S> {
    pub fn new(identity_id: impl Into<String>, storage: S) -> Self {
        Self {
            identity_id: identity_id.into(),
            storage,
        }
    }
}

#[async_trait]
impl<S: Storage> IdentityProvider for SamlProvider<S> {
    fn identity_id(&self) -> &str {
        &self.identity_id
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, IdentityError> {
        let Credentials::Saml(profile) = credentials else {
            return Err(IdentityError::UnsupportedCredentials(credentials.kind()));
        };
        if profile.user_id.is_empty() {
            return Err(IdentityError::IncompleteProfile("missing user id"));
        }

        // "Last First", skipping absent parts.
        let display_name = [profile.last_name.as_deref(), profile.first_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        upsert_external(
            &self.storage,
            ExternalUser {
                user_id: combined_user_id(&self.identity_id, &profile.user_id),
                display_name: Some(display_name).filter(|n| !n.is_empty()),
            },
        )
        .await
    }
}

/// Users found in an LDAP directory.
pub struct LdapProvider<S> {
    identity_id: String,
    storage: S,
}

impl<S: Storage> LdapProvider<S> {
    pub fn new(identity_id: impl Into<String>, storage: S) -> Self {
        Self {
            identity_id: identity_id.into(),
            storage,
        }
    }
}

#[async_trait]
impl<S: Storage> IdentityProvider for LdapProvider<S> {
    fn identity_id(&self) -> &str {
        &self.identity_id
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, IdentityError> {
        let Credentials::Ldap(entry) = credentials else {
            return Err(IdentityError::UnsupportedCredentials(credentials.kind()));
        };
        if entry.uid.is_empty() {
            return Err(IdentityError::IncompleteProfile("missing uid"));
        }

        upsert_external(
            &self.storage,
            ExternalUser {
                user_id: combined_user_id(&self.identity_id, &entry.uid),
                display_name: entry.given_name.clone(),
            },
        )
        .await
    }
}

async fn upsert_external<S: Storage>(
    storage: &S,
    input: ExternalUser,
) -> Result<Principal, IdentityError> {
    let mut conn = storage.connect().await?;
    let user = conn.upsert_external_user(&input).await?;
    Ok(Principal {
        user_id: user.user_id,
        display_name: user.display_name,
    })
}

/// Authenticate with `provider` and start a session for the principal.
pub async fn sign_in<S, P>(
    engine: &SessionEngine<S>,
    provider: &P,
    credentials: &Credentials,
    client: &ClientInfo,
) -> Result<SignedIn, IdentityError>
where
    S: Storage,
    P: IdentityProvider + ?Sized,
{
    let principal = provider
        .authenticate(credentials)
        .await
        .inspect_err(|e| {
            tracing::info!(
                identity = provider.identity_id(),
                kind = credentials.kind(),
                error = %e,
                "Authentication failed"
            )
        })?;

    let tokens = engine
        .start_session(
            &principal.user_id,
            client.user_agent.as_deref(),
            client.source_address.as_deref(),
        )
        .await?;

    Ok(SignedIn { principal, tokens })
}

/// Register a local user and start its first session. The user row and the
/// session commit together or not at all.
pub async fn sign_up<S: Storage>(
    engine: &SessionEngine<S>,
    login: &str,
    display_name: Option<&str>,
    password: &str,
    client: &ClientInfo,
) -> Result<SignedIn, IdentityError> {
    let login = login.trim();
    if login.is_empty() {
        return Err(IdentityError::Validation("login is required".into()));
    }
    validate_password_strength(password).map_err(IdentityError::Validation)?;

    let password_hash = hash_password(password).map_err(|e| IdentityError::Hashing(e.to_string()))?;
    let input = NewUser {
        user_id: combined_user_id(LOCAL_IDENTITY_ID, &Uuid::new_v4().to_string()),
        login: login.to_string(),
        display_name: display_name.map(str::to_owned),
        password_hash,
    };

    let mut tx = engine.storage().begin().await?;
    let user = tx.insert_user(&input).await.map_err(|e| {
        if e.is_conflict() {
            IdentityError::LoginTaken
        } else {
            IdentityError::Storage(e)
        }
    })?;
    let tokens = engine
        .start_session_in(
            &mut tx,
            &user.user_id,
            client.user_agent.as_deref(),
            client.source_address.as_deref(),
        )
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.user_id, "Local user registered");

    Ok(SignedIn {
        principal: Principal {
            user_id: user.user_id,
            display_name: user.display_name,
        },
        tokens,
    })
}
