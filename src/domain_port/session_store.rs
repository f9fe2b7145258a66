use std::time::Duration;

/// Key-value store holding the per-session markers.
///
/// Implementations must only ever report keys that are present and not
/// expired, and `set_pair_with_expiry` must never leave one of the two keys
/// visible without the other.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Number of live keys matching a `prefix*` pattern.
    async fn count_by_prefix(&self, pattern: &str) -> Result<usize, SessionStoreError>;

    async fn exists(&self, key: &str) -> Result<bool, SessionStoreError>;

    /// Create both keys with their own TTLs, all or nothing.
    async fn set_pair_with_expiry(
        &self,
        first_key: &str,
        first_ttl: Duration,
        second_key: &str,
        second_ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    /// Remove the given keys. Absent keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("concurrent write on {0}, transaction aborted")]
    Conflict(String),
    #[error("infra error: {0}")]
    Store(String),
}
