//! Shared domain types for the jwtauth workspace.
//!
//! Kept free of database and HTTP dependencies so both the storage layer and
//! the API crate can depend on it.

pub mod error;
pub mod identity;
pub mod types;
