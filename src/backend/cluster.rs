//! Clustered Networked Backend
//!
//! Redis-protocol cluster backend. Single-key commands are routed by slot;
//! key enumeration and flushing fan out to every primary.

use std::time::Duration;

use async_trait::async_trait;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::cluster_routing::{
    MultipleNodeRoutingInfo, ResponsePolicy, RoutingInfo, SingleNodeRoutingInfo,
};
use redis::AsyncCommands;
use regex::Regex;
use tracing::{debug, info};

use crate::backend::redis::ttl_millis;
use crate::backend::{filter_keys, CacheBackend};
use crate::config::ClusterConfig;
use crate::error::{CacheError, Result};
use crate::key::glob::prefix_glob;

fn all_primaries(policy: ResponsePolicy) -> RoutingInfo {
    RoutingInfo::MultiNode((MultipleNodeRoutingInfo::AllMasters, Some(policy)))
}

// == Cluster Backend ==
/// Clustered networked backend.
///
/// Created with [`ClusterBackend::connect`]; the caller owns the connection.
#[derive(Clone)]
pub struct ClusterBackend {
    conn: ClusterConnection,
    config: ClusterConfig,
}

impl std::fmt::Debug for ClusterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClusterBackend {
    // == Constructor ==
    /// Connects to the cluster seeded by `config.nodes`.
    pub async fn connect(config: ClusterConfig) -> Result<Self> {
        if config.nodes.is_empty() {
            return Err(CacheError::Config(
                "At least one node must be provided for cluster configuration".to_string(),
            ));
        }

        let mut builder = ClusterClient::builder(config.node_urls())
            .connection_timeout(config.connect_timeout)
            .response_timeout(config.response_timeout);
        if let Some(username) = &config.username {
            builder = builder.username(username.clone());
        }
        if let Some(password) = &config.password {
            builder = builder.password(password.clone());
        }

        let client = builder.build()?;
        let conn = client.get_async_connection().await?;
        info!("Connected to cluster via {} seed node(s)", config.nodes.len());

        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    // == Ping ==
    /// Sends PING to a random node.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _ = conn
            .route_command(
                &redis::cmd("PING"),
                RoutingInfo::SingleNode(SingleNodeRoutingInfo::Random),
            )
            .await?;
        Ok(())
    }

    /// `KEYS glob` on every primary, results combined.
    async fn keys_on_primaries(&self, glob: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("KEYS");
        cmd.arg(glob);

        let reply = conn
            .route_command(&cmd, all_primaries(ResponsePolicy::CombineArrays))
            .await?;
        let mut keys: Vec<String> = redis::from_redis_value(&reply)?;
        keys.sort_unstable();
        keys.dedup();
        debug!("KEYS {} -> {} keys", glob, keys.len());
        Ok(keys)
    }
}

#[async_trait]
impl CacheBackend for ClusterBackend {
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
        conn.route_command(
            &redis::cmd("FLUSHDB"),
            all_primaries(ResponsePolicy::AllSucceeded),
        )
        .await?;
        info!("Flushed all cluster primaries");
        Ok(())
    }

    async fn keys(&self, glob: Option<&str>) -> Result<Vec<String>> {
        self.keys_on_primaries(glob.unwrap_or("*")).await
    }

    async fn keys_by_prefix(&self, prefix: &str, pattern: Option<&Regex>) -> Result<Vec<String>> {
        let keys = self.keys_on_primaries(&prefix_glob(prefix)).await?;
        Ok(filter_keys(keys, pattern))
    }

    fn name(&self) -> &'static str {
        "cluster"
    }
}
