//! In-process counting store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CountingStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    expires_at: Instant,
}

/// Deadline used when `now + ttl` does not fit in an `Instant`.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(MAX_TTL))
        .unwrap_or(now)
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Counting store backed by a sharded concurrent map.
///
/// Expired counters are reset lazily on the next increment and dropped by
/// [`MemoryCountingStore::purge_expired`]. Nothing runs in the background.
#[derive(Debug, Default)]
pub struct MemoryCountingStore {
    counters: DashMap<String, Counter>,
}

impl MemoryCountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired counter. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.is_live(now));
        before.saturating_sub(self.counters.len())
    }

    /// Number of tracked keys, live or not yet purged.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CountingStore for MemoryCountingStore {
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let now = Instant::now();
        // The entry guard holds the shard lock, so read-modify-write is atomic per key
        let mut counter = self.counters.entry(key.to_owned()).or_insert(Counter {
            count: 0,
            expires_at: deadline(now, ttl),
        });

        if !counter.is_live(now) {
            counter.count = 0;
            counter.expires_at = deadline(now, ttl);
        }
        counter.count += 1;

        Ok(counter.count)
    }

    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        match self.counters.get(key) {
            Some(counter) if counter.is_live(now) => Ok(counter.count),
            _ => Err(StoreError::NotFound),
        }
    }
}
