//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// Represents a single cache entry with its encoded value and expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload (JSON text)
    pub value: String,
    /// Absolute expiry time, None = never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The encoded value to store
    /// * `ttl` - Optional time-to-live
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        let expires_at = ttl.map(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        });

        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiry time. Entries without expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Same check against an explicit clock reading.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("\"v\"".to_string(), None);

        assert_eq!(entry.value, "\"v\"");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new("1".to_string(), Some(Duration::from_secs(60)));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());

        let expires = entry.expires_at.unwrap();
        let remaining = expires - Utc::now();
        assert!(remaining <= chrono::Duration::seconds(60));
        assert!(remaining >= chrono::Duration::seconds(59));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("1".to_string(), Some(Duration::from_millis(100)));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let entry = CacheEntry {
            value: "1".to_string(),
            expires_at: Some(now),
        };

        // expired exactly at the boundary
        assert!(entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now - chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new("1".to_string(), Some(Duration::from_secs(u64::MAX)));
        assert!(!entry.is_expired());
    }
}
