//! Configuration Module
//!
//! Handles loading backend and decorator configuration from environment
//! variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{CacheError, Result};

/// Default decorator TTL in seconds.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Default connect and response timeout for networked backends.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_millis(500);

// == Backend Kind ==
/// Which storage backend a decorator should be built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// In-process map
    #[default]
    Memory,
    /// Single networked node
    Redis,
    /// Networked cluster
    Cluster,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" | "in_memory" => Ok(BackendKind::Memory),
            "redis" | "valkey" => Ok(BackendKind::Redis),
            "cluster" => Ok(BackendKind::Cluster),
            other => Err(CacheError::Config(format!("Unknown backend kind: {}", other))),
        }
    }
}

// == Single Node Config ==
/// Connection parameters for a single networked node.
#[derive(Debug, Clone, PartialEq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Logical database; also the namespace `clear()` wipes
    pub db: i64,
    pub use_tls: bool,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub client_name: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            db: 0,
            use_tls: false,
            connect_timeout: DEFAULT_NETWORK_TIMEOUT,
            response_timeout: DEFAULT_NETWORK_TIMEOUT,
            client_name: None,
        }
    }
}

impl RedisConfig {
    /// Local node on `port`, database `db`.
    pub fn localhost(port: u16, db: i64) -> Self {
        Self {
            port,
            db,
            ..Self::default()
        }
    }

    /// Remote node, optionally over TLS.
    pub fn remote(host: impl Into<String>, port: u16, use_tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls,
            ..Self::default()
        }
    }

    /// Connection URL without credentials.
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "rediss" } else { "redis" };
        format!("{}://{}:{}/{}", scheme, self.host, self.port, self.db)
    }

    /// Builds the client connection info, credentials included.
    #[cfg(feature = "redis")]
    pub fn connection_info(&self) -> Result<redis::ConnectionInfo> {
        use redis::IntoConnectionInfo;

        let mut info = self.url().as_str().into_connection_info()?;
        info.redis.username = self.username.clone();
        info.redis.password = self.password.clone();
        Ok(info)
    }

    /// Loads from `REDIS_*` environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` (default: localhost), `REDIS_PORT` (default: 6379)
    /// - `REDIS_USERNAME`, `REDIS_PASSWORD`, `REDIS_CLIENT_NAME` (optional)
    /// - `REDIS_DB` (default: 0), `REDIS_TLS` (default: false)
    /// - `REDIS_CONNECT_TIMEOUT_MS`, `REDIS_RESPONSE_TIMEOUT_MS` (default: 500)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("REDIS_HOST").unwrap_or(defaults.host),
            port: env_or("REDIS_PORT", defaults.port),
            username: env::var("REDIS_USERNAME").ok(),
            password: env::var("REDIS_PASSWORD").ok(),
            db: env_or("REDIS_DB", defaults.db),
            use_tls: env_or("REDIS_TLS", defaults.use_tls),
            connect_timeout: env_millis("REDIS_CONNECT_TIMEOUT_MS", defaults.connect_timeout),
            response_timeout: env_millis("REDIS_RESPONSE_TIMEOUT_MS", defaults.response_timeout),
            client_name: env::var("REDIS_CLIENT_NAME").ok(),
        }
    }
}

// == Cluster Config ==
/// Connection parameters for a networked cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Seed nodes as `(host, port)`
    pub nodes: Vec<(String, u16)>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: vec![("localhost".to_string(), 6379)],
            username: None,
            password: None,
            use_tls: false,
            connect_timeout: DEFAULT_NETWORK_TIMEOUT,
            response_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }
}

impl ClusterConfig {
    /// Cluster seeded by `nodes`. Fails if `nodes` is empty.
    pub fn cluster(nodes: Vec<(String, u16)>, use_tls: bool) -> Result<Self> {
        if nodes.is_empty() {
            return Err(CacheError::Config(
                "At least one node must be provided for cluster configuration".to_string(),
            ));
        }
        Ok(Self {
            nodes,
            use_tls,
            ..Self::default()
        })
    }

    /// One URL per seed node.
    pub fn node_urls(&self) -> Vec<String> {
        let scheme = if self.use_tls { "rediss" } else { "redis" };
        self.nodes
            .iter()
            .map(|(host, port)| format!("{}://{}:{}", scheme, host, port))
            .collect()
    }

    /// Loads from `REDIS_CLUSTER_NODES` (comma-separated `host:port`) plus
    /// the shared `REDIS_*` credential, TLS and timeout variables.
    pub fn from_env() -> Self {
        let single = RedisConfig::from_env();
        let nodes = match env::var("REDIS_CLUSTER_NODES") {
            Ok(raw) => parse_nodes(&raw),
            Err(_) => vec![(single.host.clone(), single.port)],
        };
        Self {
            nodes,
            username: single.username,
            password: single.password,
            use_tls: single.use_tls,
            connect_timeout: single.connect_timeout,
            response_timeout: single.response_timeout,
        }
    }
}

/// Parses `host:port,host:port`, skipping malformed entries.
pub fn parse_nodes(raw: &str) -> Vec<(String, u16)> {
    raw.split(',')
        .map(str::trim)
        .filter(|node| !node.is_empty())
        .filter_map(|node| {
            let parsed = node
                .rsplit_once(':')
                .and_then(|(host, port)| port.parse().ok().map(|port| (host.to_string(), port)));
            if parsed.is_none() {
                warn!("Ignoring malformed cluster node: {}", node);
            }
            parsed
        })
        .collect()
}

// == Config ==
/// Top-level configuration: which backend, how to reach it, default TTL.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: BackendKind,
    /// Default TTL for cached results, None = never expire
    pub default_ttl: Option<Duration>,
    pub redis: RedisConfig,
    pub cluster: ClusterConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory`, `redis` or `cluster` (default: memory)
    /// - `CACHE_DEFAULT_TTL` - seconds; `0` or `none` disables expiry (default: 60)
    /// - `REDIS_*` - see [`RedisConfig::from_env`] and [`ClusterConfig::from_env`]
    pub fn from_env() -> Self {
        let backend = match env::var("CACHE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                warn!("{}; falling back to memory backend", err);
                BackendKind::Memory
            }),
            Err(_) => BackendKind::Memory,
        };

        Self {
            backend,
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .map(|raw| parse_ttl(&raw))
                .unwrap_or(Some(Duration::from_secs(DEFAULT_TTL_SECS))),
            redis: RedisConfig::from_env(),
            cluster: ClusterConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            default_ttl: Some(Duration::from_secs(DEFAULT_TTL_SECS)),
            redis: RedisConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

/// Parses a TTL in seconds. `0`, `none` and empty mean "never expire";
/// unparseable input falls back to the default TTL.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!("Invalid TTL '{}', using {}s", raw, DEFAULT_TTL_SECS);
            Some(Duration::from_secs(DEFAULT_TTL_SECS))
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_millis(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.db, 0);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_BACKEND");
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("REDIS_HOST");
        env::remove_var("REDIS_PORT");
        env::remove_var("REDIS_CLUSTER_NODES");

        let config = Config::from_env();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.redis.host, "localhost");
        assert_eq!(config.cluster.nodes, vec![("localhost".to_string(), 6379)]);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("Redis".parse::<BackendKind>().unwrap(), BackendKind::Redis);
        assert_eq!("valkey".parse::<BackendKind>().unwrap(), BackendKind::Redis);
        assert_eq!(" cluster ".parse::<BackendKind>().unwrap(), BackendKind::Cluster);
        assert!("memcached".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl("300"), Some(Duration::from_secs(300)));
        assert_eq!(parse_ttl("0"), None);
        assert_eq!(parse_ttl("none"), None);
        assert_eq!(parse_ttl("soon"), Some(Duration::from_secs(DEFAULT_TTL_SECS)));
    }

    #[test]
    fn test_parse_nodes() {
        let nodes = parse_nodes("a:7000, b:7001,broken,,c:x");
        assert_eq!(
            nodes,
            vec![("a".to_string(), 7000), ("b".to_string(), 7001)]
        );
    }

    #[test]
    fn test_cluster_requires_nodes() {
        assert!(matches!(
            ClusterConfig::cluster(Vec::new(), false),
            Err(CacheError::Config(_))
        ));

        let config = ClusterConfig::cluster(vec![("n1".to_string(), 7000)], true).unwrap();
        assert_eq!(config.node_urls(), vec!["rediss://n1:7000"]);
    }

    #[test]
    fn test_redis_constructors() {
        let local = RedisConfig::localhost(6380, 2);
        assert_eq!(local.url(), "redis://localhost:6380/2");

        let remote = RedisConfig::remote("cache.internal", 6379, true);
        assert_eq!(remote.url(), "rediss://cache.internal:6379/0");
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_connection_info_carries_credentials() {
        let config = RedisConfig {
            username: Some("app".to_string()),
            password: Some("p@ss:word".to_string()),
            db: 3,
            ..RedisConfig::default()
        };
        let info = config.connection_info().unwrap();
        assert_eq!(info.redis.db, 3);
        assert_eq!(info.redis.username.as_deref(), Some("app"));
        assert_eq!(info.redis.password.as_deref(), Some("p@ss:word"));
    }
}
