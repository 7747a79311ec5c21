//! User model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use jwtauth_core::types::{Timestamp, UserId};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: UserId,
    pub login: Option<String>,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a local user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: UserId,
    pub login: String,
    pub display_name: Option<String>,
    pub password_hash: String,
}

/// DTO for creating or refreshing a user asserted by an external identity
/// source (SAML, LDAP).
#[derive(Debug, Clone)]
pub struct ExternalUser {
    pub user_id: UserId,
    pub display_name: Option<String>,
}
