//! Counting store capability.
//!
//! The rate limiter only needs an atomic increment-with-expiry and a read.
//! Production deployments back this with Redis; tests and single-node setups
//! use the in-process store.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryCountingStore;
pub use redis::RedisCountingStore;

/// Errors surfaced by a counting store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Key is absent or its TTL elapsed.
    #[error("Key not found")]
    NotFound,

    /// Backend unreachable or returned an error.
    #[error("Counting store unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer in time.
    #[error("Counting store timed out after {0:?}")]
    Timeout(Duration),
}

/// Key/value counters with per-key expiry.
///
/// Implementations must make `increment_with_expiry` atomic; the limiter
/// issues independent calls and applies no locking of its own.
#[async_trait]
pub trait CountingStore: Send + Sync {
    /// Increment the counter for `key` and return the new count.
    ///
    /// A missing or expired key starts a fresh counter at 1 living for `ttl`.
    /// An existing counter keeps its original expiry.
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Read the counter for `key`, or [`StoreError::NotFound`] if absent or expired.
    async fn get(&self, key: &str) -> Result<i64, StoreError>;
}
