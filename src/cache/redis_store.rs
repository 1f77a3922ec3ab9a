//! Redis cache backend.
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own; each
//! operation clones the handle. Prefix clears walk the keyspace with
//! `SCAN MATCH` and delete in batches so the server is never blocked by
//! `KEYS`.

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::store::{CacheError, CacheStore};

const DELETE_BATCH: usize = 500;

pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(CacheError::unavailable)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(CacheError::unavailable)?;
        info!(backend = "redis", "Cache backend connected");
        Ok(Self { connection })
    }
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('*');
    escaped
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(CacheError::unavailable)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .set(key, value.as_ref())
            .await
            .map_err(CacheError::unavailable)?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let removed: usize = conn.del(keys).await.map_err(CacheError::unavailable)?;
        Ok(removed)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let pattern = escape_glob(prefix);
        let mut matching = Vec::new();
        {
            let mut scan_conn = self.connection.clone();
            let mut iter: redis::AsyncIter<String> = scan_conn
                .scan_match(&pattern)
                .await
                .map_err(CacheError::unavailable)?;
            while let Some(key) = iter.next_item().await {
                matching.push(key);
            }
        }

        let mut removed = 0;
        for chunk in matching.chunks(DELETE_BATCH) {
            removed += self.delete(chunk).await?;
        }
        debug!(prefix, scanned = matching.len(), removed, "Prefix cleared");
        Ok(removed)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::unavailable)?;
        Ok(())
    }
}
