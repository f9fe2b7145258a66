use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Process-local session store for development and tests.
///
/// Entries carry their own deadline and are dropped lazily on access. One lock
/// guards the whole map, so a pair write is never observed half done.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Instant>>, SessionStoreError> {
        self.entries
            .lock()
            .map_err(|_| SessionStoreError::Store("memory store lock poisoned".to_string()))
    }

    fn live_entries(&self) -> Result<MutexGuard<'_, HashMap<String, Instant>>, SessionStoreError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        entries.retain(|_, deadline| *deadline > now);
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn count_by_prefix(&self, pattern: &str) -> Result<usize, SessionStoreError> {
        let entries = self.live_entries()?;
        let count = match pattern.strip_suffix('*') {
            Some(prefix) => entries.keys().filter(|k| k.starts_with(prefix)).count(),
            None => usize::from(entries.contains_key(pattern)),
        };
        Ok(count)
    }

    async fn exists(&self, key: &str) -> Result<bool, SessionStoreError> {
        Ok(self.live_entries()?.contains_key(key))
    }

    async fn set_pair_with_expiry(
        &self,
        first_key: &str,
        first_ttl: Duration,
        second_key: &str,
        second_ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let mut entries = self.live_entries()?;
        let now = Instant::now();
        entries.insert(first_key.to_string(), now + first_ttl);
        entries.insert(second_key.to_string(), now + second_ttl);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), SessionStoreError> {
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_write_and_lookup() {
        let store = MemorySessionStore::new();
        store
            .set_pair_with_expiry(
                "a:1:s1",
                Duration::from_secs(60),
                "r:1:s1",
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert!(store.exists("a:1:s1").await.unwrap());
        assert!(store.exists("r:1:s1").await.unwrap());
        assert!(!store.exists("r:1:s2").await.unwrap());
    }

    #[tokio::test]
    async fn count_by_prefix_is_scoped_to_user() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(60);
        for (a, r) in [("a:1:x", "r:1:x"), ("a:1:y", "r:1:y"), ("a:12:z", "r:12:z")] {
            store.set_pair_with_expiry(a, ttl, r, ttl).await.unwrap();
        }

        assert_eq!(store.count_by_prefix("r:1:*").await.unwrap(), 2);
        assert_eq!(store.count_by_prefix("r:12:*").await.unwrap(), 1);
        assert_eq!(store.count_by_prefix("r:2:*").await.unwrap(), 0);
        assert_eq!(store.count_by_prefix("r:1:x").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn entries_expire_independently() {
        let store = MemorySessionStore::new();
        store
            .set_pair_with_expiry(
                "a:1:s",
                Duration::from_millis(50),
                "r:1:s",
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(!store.exists("a:1:s").await.unwrap());
        assert!(store.exists("r:1:s").await.unwrap());
        assert_eq!(store.count_by_prefix("a:1:*").await.unwrap(), 0);
        assert_eq!(store.count_by_prefix("r:1:*").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_ignores_absent_keys() {
        let store = MemorySessionStore::new();
        let ttl = Duration::from_secs(60);
        store
            .set_pair_with_expiry("a:1:s", ttl, "r:1:s", ttl)
            .await
            .unwrap();

        store
            .delete(&["a:1:s".to_string(), "r:1:s".to_string(), "r:9:gone".to_string()])
            .await
            .unwrap();
        store.delete(&[]).await.unwrap();

        assert!(!store.exists("a:1:s").await.unwrap());
        assert!(!store.exists("r:1:s").await.unwrap());
    }
}
