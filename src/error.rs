//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for backends, key patterns and bindings.
///
/// Errors raised by the wrapped business operations are never converted
/// into this type; they travel back to the caller in their own error type.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Generic backend failure (unavailable, poisoned, unexpected reply)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Failure reported by a networked key-value store
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Cached payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalidation or enumeration pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A cached/invalidating operation ran on an object with no backend binding
    #[error("Cache decorator not initialized: {0}")]
    NotInitialized(String),
}

impl CacheError {
    // == Classification ==
    /// Returns true for connection-level failures (refused, dropped, timed out).
    ///
    /// The decorators log these at `warn` since they are expected while a
    /// networked backend is unreachable.
    pub fn is_connection_issue(&self) -> bool {
        match self {
            #[cfg(feature = "redis")]
            CacheError::Redis(err) => {
                err.is_io_error()
                    || err.is_timeout()
                    || err.is_connection_dropped()
                    || err.is_connection_refusal()
            }
            _ => false,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
