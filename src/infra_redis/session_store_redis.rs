use crate::domain_port::*;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{AsyncCommands, RedisError, RedisResult};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

const SCAN_BATCH: usize = 100;

pub struct RedisSessionStore {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
    call_timeout: Duration,
}

impl RedisSessionStore {
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(3);

    /// `client` is kept around for the dedicated connections WATCH needs;
    /// every other command goes through the shared `conn`.
    pub fn new(
        client: redis::Client,
        conn: ConnectionManager,
        prefix: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        RedisSessionStore {
            client,
            conn,
            prefix: prefix.into(),
            call_timeout,
        }
    }

    fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, SessionStoreError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        bounded(self.call_timeout, call).await
    }

    /// Opens a dedicated connection and WATCHes both keys. Any write to either
    /// key before [`PairWrite::commit`] makes the commit fail with `Conflict`.
    ///
    /// WATCH is connection state, so it cannot share the multiplexed manager
    /// connection with unrelated callers.
    pub async fn watch_pair(
        &self,
        first_key: &str,
        second_key: &str,
    ) -> Result<PairWrite, SessionStoreError> {
        let first = self.key(first_key);
        let second = self.key(second_key);
        let client = self.client.clone();

        let watch = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _: () = redis::cmd("WATCH")
                .arg(&first)
                .arg(&second)
                .query_async(&mut conn)
                .await?;
            Ok::<MultiplexedConnection, RedisError>(conn)
        };
        let conn = self.bounded(watch).await?;

        Ok(PairWrite {
            conn,
            first,
            second,
            call_timeout: self.call_timeout,
        })
    }
}

/// Two watched keys waiting for their `MULTI`/`EXEC`.
pub struct PairWrite {
    conn: MultiplexedConnection,
    first: String,
    second: String,
    call_timeout: Duration,
}

impl PairWrite {
    pub async fn commit(
        self,
        first_ttl: Duration,
        second_ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let PairWrite {
            mut conn,
            first,
            second,
            call_timeout,
        } = self;

        let exec = async {
            // EXEC replies nil when a watched key changed.
            let committed: Option<()> = redis::pipe()
                .atomic()
                .set_ex(&first, true, first_ttl.as_secs().max(1))
                .ignore()
                .set_ex(&second, true, second_ttl.as_secs().max(1))
                .ignore()
                .query_async(&mut conn)
                .await?;
            Ok::<bool, RedisError>(committed.is_some())
        };

        if bounded(call_timeout, exec).await? {
            Ok(())
        } else {
            Err(SessionStoreError::Conflict(format!("{}, {}", first, second)))
        }
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, SessionStoreError>
where
    F: Future<Output = RedisResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|e| SessionStoreError::Store(e.to_string())),
        Err(_) => Err(SessionStoreError::Timeout(limit)),
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn count_by_prefix(&self, pattern: &str) -> Result<usize, SessionStoreError> {
        let pattern = self.key(pattern);
        let mut conn = self.conn.clone();

        // SCAN instead of KEYS so a large keyspace does not block the server.
        // A key can be reported more than once across cursor steps.
        let scan = async move {
            let mut seen: HashSet<String> = HashSet::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await?;
                seen.extend(keys);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            Ok::<usize, RedisError>(seen.len())
        };

        self.bounded(scan).await
    }

    async fn exists(&self, key: &str) -> Result<bool, SessionStoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let found: bool = self.bounded(conn.exists(&key)).await?;
        Ok(found)
    }

    async fn set_pair_with_expiry(
        &self,
        first_key: &str,
        first_ttl: Duration,
        second_key: &str,
        second_ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.watch_pair(first_key, second_key)
            .await?
            .commit(first_ttl, second_ttl)
            .await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), SessionStoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        let mut conn = self.conn.clone();
        let _: () = self.bounded(conn.del(keys)).await?;
        Ok(())
    }
}
