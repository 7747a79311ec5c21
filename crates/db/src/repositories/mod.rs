//! Query functions for each table. Every function takes any PostgreSQL
//! executor, so the same query runs against the pool or inside a
//! transaction.

pub mod refresh_token_repo;
pub mod session_repo;
pub mod user_repo;

pub use refresh_token_repo::RefreshTokenRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
