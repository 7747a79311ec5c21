//! Identity naming shared by every identity provider.

use crate::error::CoreError;
use crate::types::UserId;

/// Identity id of users registered with a local login and password.
pub const LOCAL_IDENTITY_ID: &str = "local";

/// Build the user id stored for an account of the given identity source.
///
/// The same external id coming from two sources yields two distinct users.
pub fn combined_user_id(identity_id: &str, external_id: &str) -> UserId {
    format!("{identity_id}:{external_id}")
}

/// Split a combined user id back into `(identity_id, external_id)`.
pub fn split_user_id(user_id: &str) -> Result<(&str, &str), CoreError> {
    user_id
        .split_once(':')
        .filter(|(identity, external)| !identity.is_empty() && !external.is_empty())
        .ok_or_else(|| CoreError::Validation(format!("malformed user id: {user_id}")))
}
