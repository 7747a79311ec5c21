//! Identity provider and sign-in / sign-up tests against in-memory storage.

mod common;

use assert_matches::assert_matches;
use common::test_engine;
use jwtauth_api::auth::identity::{
    sign_in, sign_up, ClientInfo, Credentials, IdentityError, IdentityProvider, LdapEntry,
    LdapProvider, LocalProvider, SamlProfile, SamlProvider,
};
use jwtauth_api::config::AuthConfig;
use jwtauth_core::identity::split_user_id;
use jwtauth_db::MemoryStorage;

const PASSWORD: &str = "correct-horse-battery";

fn client() -> ClientInfo {
    ClientInfo {
        user_agent: Some("test-agent".to_string()),
        source_address: Some("1.2.3.4".to_string()),
    }
}

fn password(login: &str, password: &str) -> Credentials {
    Credentials::Password {
        login: login.to_string(),
        password: password.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Local accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sign_up_creates_user_and_session() {
    let storage = MemoryStorage::new();
    let engine = test_engine(storage.clone());

    let signed_in = sign_up(&engine, "alice", Some("Alice"), PASSWORD, &client())
        .await
        .unwrap();

    let (identity, external) = split_user_id(&signed_in.principal.user_id).unwrap();
    assert_eq!(identity, "local");
    assert!(!external.is_empty());
    assert_eq!(signed_in.principal.display_name.as_deref(), Some("Alice"));
    assert_eq!(storage.session_count().await, 1);

    let verified = engine
        .verify_access_token(&signed_in.tokens.access_token)
        .unwrap();
    assert_eq!(verified.user_id, signed_in.principal.user_id);
}

#[tokio::test]
async fn test_sign_up_with_taken_login_rolls_back() {
    let storage = MemoryStorage::new();
    let engine = test_engine(storage.clone());
    sign_up(&engine, "alice", None, PASSWORD, &client())
        .await
        .unwrap();

    let result = sign_up(&engine, "alice", None, PASSWORD, &client()).await;

    assert_matches!(result, Err(IdentityError::LoginTaken));
    assert_eq!(storage.session_count().await, 1, "no session for the failed signup");
}

#[tokio::test]
async fn test_sign_up_validates_input() {
    let engine = test_engine(MemoryStorage::new());

    let short = sign_up(&engine, "alice", None, "short", &client()).await;
    assert_matches!(short, Err(IdentityError::Validation(_)));

    let blank = sign_up(&engine, "   ", None, PASSWORD, &client()).await;
    assert_matches!(blank, Err(IdentityError::Validation(_)));
}

#[tokio::test]
async fn test_local_sign_in() {
    let storage = MemoryStorage::new();
    let engine = test_engine(storage.clone());
    let registered = sign_up(&engine, "alice", None, PASSWORD, &client())
        .await
        .unwrap();
    let provider = LocalProvider::new(storage.clone());

    let signed_in = sign_in(&engine, &provider, &password("alice", PASSWORD), &client())
        .await
        .unwrap();

    assert_eq!(signed_in.principal.user_id, registered.principal.user_id);
    assert_eq!(storage.session_count().await, 2);
}

#[tokio::test]
async fn test_local_sign_in_rejects_bad_credentials() {
    let storage = MemoryStorage::new();
    let engine = test_engine(storage.clone());
    sign_up(&engine, "alice", None, PASSWORD, &client())
        .await
        .unwrap();
    let provider = LocalProvider::new(storage.clone());

    let wrong = sign_in(&engine, &provider, &password("alice", "wrong-password"), &client()).await;
    assert_matches!(wrong, Err(IdentityError::InvalidCredentials));

    let unknown = sign_in(&engine, &provider, &password("bob", PASSWORD), &client()).await;
    assert_matches!(unknown, Err(IdentityError::InvalidCredentials));

    assert_eq!(storage.session_count().await, 1);
}

#[tokio::test]
async fn test_provider_rejects_foreign_credentials() {
    let storage = MemoryStorage::new();
    let provider = LocalProvider::new(storage);

    let result = provider
        .authenticate(&Credentials::Ldap(LdapEntry {
            uid: "bob".to_string(),
            given_name: None,
        }))
        .await;

    assert_matches!(result, Err(IdentityError::UnsupportedCredentials("ldap")));
}

// ---------------------------------------------------------------------------
// External identities
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_saml_sign_in_upserts_user() {
    let storage = MemoryStorage::new();
    let engine = test_engine(storage.clone());
    let provider = SamlProvider::new("saml", storage.clone());
    let profile = SamlProfile {
        user_id: "bob@example.com".to_string(),
        first_name: Some("Bob".to_string()),
        last_name: Some("Smith".to_string()),
    };

    let signed_in = sign_in(&engine, &provider, &Credentials::Saml(profile.clone()), &client())
        .await
        .unwrap();
    assert_eq!(signed_in.principal.user_id, "saml:bob@example.com");
    assert_eq!(signed_in.principal.display_name.as_deref(), Some("Smith Bob"));

    let renamed = SamlProfile {
        first_name: Some("Robert".to_string()),
        ..profile
    };
    let again = sign_in(&engine, &provider, &Credentials::Saml(renamed), &client())
        .await
        .unwrap();
    assert_eq!(again.principal.user_id, signed_in.principal.user_id);
    assert_eq!(again.principal.display_name.as_deref(), Some("Smith Robert"));
}

#[tokio::test]
async fn test_saml_profile_without_user_id_is_rejected() {
    let storage = MemoryStorage::new();
    let provider = SamlProvider::new("saml", storage);

    let result = provider
        .authenticate(&Credentials::Saml(SamlProfile {
            user_id: String::new(),
            first_name: None,
            last_name: None,
        }))
        .await;

    assert_matches!(result, Err(IdentityError::IncompleteProfile(_)));
}

#[tokio::test]
async fn test_ldap_sign_in_uses_given_name() {
    let storage = MemoryStorage::new();
    let engine = test_engine(storage.clone());
    let provider = LdapProvider::new("ldap", storage.clone());

    let signed_in = sign_in(
        &engine,
        &provider,
        &Credentials::Ldap(LdapEntry {
            uid: "carol".to_string(),
            given_name: Some("Carol".to_string()),
        }),
        &client(),
    )
    .await
    .unwrap();

    assert_eq!(signed_in.principal.user_id, "ldap:carol");
    assert_eq!(signed_in.principal.display_name.as_deref(), Some("Carol"));
}

#[tokio::test]
async fn test_configured_identity_ids_prefix_user_ids() {
    let config = AuthConfig::from_lookup(|name| match name {
        "TOKEN_PRIVATE_KEY" | "TOKEN_PUBLIC_KEY" => Some("unused".to_string()),
        "SAML_IDENTITY_ID" => Some("corp".to_string()),
        "LDAP_IDENTITY_ID" => Some("dir".to_string()),
        _ => None,
    });
    let storage = MemoryStorage::new();
    let saml = config.saml_provider(storage.clone());
    let ldap = config.ldap_provider(storage);

    assert_eq!(saml.identity_id(), "corp");
    assert_eq!(ldap.identity_id(), "dir");

    let principal = ldap
        .authenticate(&Credentials::Ldap(LdapEntry {
            uid: "dave".to_string(),
            given_name: None,
        }))
        .await
        .unwrap();
    assert_eq!(principal.user_id, "dir:dave");
}
