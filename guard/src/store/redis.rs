//! Redis-backed counting store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{CountingStore, StoreError};

/// Embedded Lua script for atomic increment-and-expire.
const INCR_EXPIRE_SCRIPT: &str = include_str!("incr_expire.lua");

/// Default per-call deadline for store round-trips.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Counting store backed by Redis.
///
/// Increments run as a Lua script so the INCR and the PEXPIRE of a fresh
/// window happen atomically across every server instance.
#[derive(Clone)]
pub struct RedisCountingStore {
    redis: Client,
    script_sha: Arc<RwLock<String>>,
    timeout: Duration,
}

impl RedisCountingStore {
    /// Creates a store over an existing client.
    ///
    /// Call `init()` after creation to load the Lua script into Redis.
    pub fn new(redis: Client, timeout: Duration) -> Self {
        Self {
            redis,
            script_sha: Arc::new(RwLock::new(String::new())),
            timeout,
        }
    }

    /// Connect to `redis_url`, wait for the connection, and load the script.
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self, Error> {
        let config = Config::from_url(redis_url)?;
        let client = Client::new(config, None, None, None);
        client.connect();
        client.wait_for_connect().await?;
        info!("Connected to Redis counting store");

        let store = Self::new(client, timeout);
        store.init().await?;
        Ok(store)
    }

    /// Loads the Lua script into Redis.
    pub async fn init(&self) -> Result<(), Error> {
        self.load_script().await
    }

    async fn load_script(&self) -> Result<(), Error> {
        let sha: String = self.redis.script_load(INCR_EXPIRE_SCRIPT).await?;
        info!(incr_expire_sha = %sha, "Lua script loaded into Redis");

        *self.script_sha.write().await = sha;
        Ok(())
    }

    /// Checks if an error is a NOSCRIPT error (script not found in Redis).
    fn is_noscript_error(error: &Error) -> bool {
        error.to_string().contains("NOSCRIPT")
    }

    async fn eval_incr(&self, key: &str, window_ms: u128) -> Result<i64, Error> {
        let sha = self.script_sha.read().await.clone();
        self.redis
            .evalsha(&sha, vec![key], vec![window_ms.to_string()])
            .await
    }

    /// Run `fut` under the configured deadline.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, Error>> + Send,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CountingStore for RedisCountingStore {
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        // Redis rejects a zero PEXPIRE, so clamp sub-millisecond windows
        let window_ms = ttl.as_millis().max(1);

        match tokio::time::timeout(self.timeout, self.eval_incr(key, window_ms)).await {
            Ok(Ok(count)) => Ok(count),
            Ok(Err(e)) if Self::is_noscript_error(&e) => {
                warn!("NOSCRIPT error, reloading Lua script");
                self.bounded(self.load_script()).await?;
                self.bounded(self.eval_incr(key, window_ms)).await
            }
            Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }

    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        let value: Option<i64> = self.bounded(self.redis.get(key)).await?;
        value.ok_or(StoreError::NotFound)
    }
}
