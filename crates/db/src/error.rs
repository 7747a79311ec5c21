//! Storage errors and per-call query timeouts.

use std::future::Future;
use std::time::Duration;

/// Default timeout applied to every storage call.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(20);

/// Transport-level storage failure.
///
/// None of these carry domain meaning; callers translate absence of rows
/// themselves.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage call timed out after {0:?}")]
    Timeout(Duration),

    /// A uniqueness rule was violated (e.g. duplicate primary key or login).
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether the error is a uniqueness violation, regardless of backend.
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::Conflict(_) => true,
            // PostgreSQL unique_violation
            StoreError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Run a storage future, failing with [`StoreError::Timeout`] once `duration`
/// elapses. The future is dropped on timeout, which rolls back any enclosing
/// transaction once its handle is dropped too.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> StoreResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!(timeout_ms = duration.as_millis() as u64, "Storage call timed out");
            Err(StoreError::Timeout(duration))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_timeout_elapses() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await;
        assert_matches!(result, Err(StoreError::Timeout(d)) if d == Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_database_error_passes_through() {
        let result = with_timeout(DEFAULT_QUERY_TIMEOUT, async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await;
        assert_matches!(result, Err(StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_timeout_error_display() {
        let err = StoreError::Timeout(Duration::from_secs(20));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("20s"));
    }

    #[test]
    fn test_conflict_detection() {
        assert!(StoreError::Conflict("dup".into()).is_conflict());
        assert!(!StoreError::Timeout(DEFAULT_QUERY_TIMEOUT).is_conflict());
    }
}
