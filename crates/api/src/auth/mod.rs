//! Authentication and session primitives.
//!
//! - [`jwt`] -- signing and verification of access and refresh tokens.
//! - [`session`] -- the session/token lifecycle engine.
//! - [`identity`] -- identity providers (local, SAML, LDAP) and sign-in.
//! - [`password`] -- Argon2id password hashing.

pub mod identity;
pub mod jwt;
pub mod password;
pub mod session;
