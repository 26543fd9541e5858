//! Single-Node Networked Backend
//!
//! Redis-protocol backend over a multiplexed async connection. Values are
//! stored as JSON text; the namespace is the configured logical database.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use regex::Regex;
use tracing::{debug, info};

use crate::backend::{filter_keys, CacheBackend};
use crate::config::RedisConfig;
use crate::error::Result;
use crate::key::glob::prefix_glob;

/// Keys requested per SCAN round-trip.
const SCAN_BATCH: usize = 500;

// == Redis Backend ==
/// Single-node networked backend.
///
/// The connection is owned by the caller: create it with [`RedisBackend::connect`]
/// and drop it when done. Clones share the multiplexed connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    config: RedisConfig,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    // == Constructor ==
    /// Opens a multiplexed connection using `config`.
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.connection_info()?)?;
        let conn = client
            .get_multiplexed_async_connection_with_timeouts(
                config.response_timeout,
                config.connect_timeout,
            )
            .await?;

        let backend = Self { conn, config };
        if let Some(name) = backend.config.client_name.clone() {
            let mut conn = backend.conn.clone();
            let _: () = redis::cmd("CLIENT")
                .arg("SETNAME")
                .arg(&name)
                .query_async(&mut conn)
                .await?;
        }

        info!(
            "Connected to {}:{} db={}",
            backend.config.host, backend.config.port, backend.config.db
        );
        Ok(backend)
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    // == Ping ==
    /// Round-trips a PING to check connectivity.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Cursor-driven `SCAN MATCH` until the cursor returns to zero.
    async fn scan(&self, glob: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        debug!("SCAN {} -> {} keys", glob, keys.len());
        Ok(keys)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl.map(ttl_millis) {
            Some(ms) => {
                let _: () = conn.pset_ex(key, value, ms).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        info!("Flushed db {}", self.config.db);
        Ok(())
    }

    async fn keys(&self, glob: Option<&str>) -> Result<Vec<String>> {
        self.scan(glob.unwrap_or("*")).await
    }

    async fn keys_by_prefix(&self, prefix: &str, pattern: Option<&Regex>) -> Result<Vec<String>> {
        let keys = self.scan(&prefix_glob(prefix)).await?;
        Ok(filter_keys(keys, pattern))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// TTL in whole milliseconds, at least 1 so a tiny TTL still expires.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_millis(1500)), 1500);
    }

    #[test]
    fn test_prefix_glob_escapes_metacharacters() {
        assert_eq!(prefix_glob("get_user"), "get_user*");
        assert_eq!(prefix_glob("odd[*]"), r"odd\[\*\]*");
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_issue() {
        let config = RedisConfig {
            port: 1,
            connect_timeout: Duration::from_millis(200),
            response_timeout: Duration::from_millis(200),
            ..RedisConfig::default()
        };

        let err = RedisBackend::connect(config).await.unwrap_err();
        assert!(err.is_connection_issue(), "unexpected error: {}", err);
    }
}
