//! Fixed-window rate limiter over a pluggable counting store.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::quota::QuotaError;
use crate::ratelimit::constants::KEY_CAPACITY;
use crate::ratelimit::{normalize_ip, LimitConfig, RateLimitAction, RateLimitConfig, RateLimitInfo};
use crate::store::{CountingStore, StoreError};

/// Rate limiter service.
///
/// Counting is delegated to the store's atomic increment; the limiter holds
/// no locks. Any store failure admits the request.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CountingStore>,
    config: Arc<RateLimitConfig>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CountingStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration for this rate limiter.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// The configured policy for `action`.
    pub fn policy(&self, action: RateLimitAction) -> LimitConfig {
        self.config.policies.get(action)
    }

    /// Count one request against `scope_key` and reject it once the window
    /// holds more than `cfg.limit` requests.
    ///
    /// # Errors
    /// Returns [`QuotaError::RateLimited`] when the limit is exceeded. Store
    /// failures never produce an error.
    #[tracing::instrument(skip(self))]
    pub async fn check(&self, scope_key: &str, cfg: &LimitConfig) -> Result<(), QuotaError> {
        if !self.config.enabled {
            return Ok(());
        }

        let key = self.build_key(scope_key);
        let count = match self.store.increment_with_expiry(&key, cfg.window).await {
            Ok(count) => count,
            Err(e) => {
                warn!(key = %key, error = %e, "Counting store failed, allowing request");
                return Ok(());
            }
        };

        if count > i64::from(cfg.limit) {
            debug!(key = %key, count, limit = cfg.limit, "Rate limit exceeded");
            return Err(QuotaError::rate_limited(
                cfg.limit,
                cfg.window,
                cfg.window_secs(),
            ));
        }
        Ok(())
    }

    /// Per-user, per-action limit.
    pub async fn check_user(
        &self,
        user_id: Uuid,
        action: RateLimitAction,
        cfg: &LimitConfig,
    ) -> Result<(), QuotaError> {
        self.check(&user_scope(user_id, action), cfg).await
    }

    /// Per-user, per-channel, per-action limit.
    pub async fn check_channel(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
        action: RateLimitAction,
        cfg: &LimitConfig,
    ) -> Result<(), QuotaError> {
        self.check(&channel_scope(user_id, channel_id, action), cfg)
            .await
    }

    /// Per-source-address limit for unauthenticated endpoints.
    pub async fn check_ip(
        &self,
        ip: IpAddr,
        action: RateLimitAction,
        cfg: &LimitConfig,
    ) -> Result<(), QuotaError> {
        self.check(&ip_scope(ip, action), cfg).await
    }

    /// One message per `slowmode_secs` for a user in a channel.
    ///
    /// Non-positive values disable slowmode. Enforced even when rate limiting
    /// is disabled.
    #[tracing::instrument(skip(self))]
    pub async fn check_slowmode(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
        slowmode_secs: i64,
    ) -> Result<(), QuotaError> {
        if slowmode_secs <= 0 {
            return Ok(());
        }
        let secs = slowmode_secs as u64;
        let key = self.build_key(&slowmode_scope(user_id, channel_id));

        match self.store.get(&key).await {
            Ok(_) => {
                debug!(key = %key, "Slowmode active");
                return Err(QuotaError::slowmode(secs, secs));
            }
            Err(StoreError::NotFound) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Counting store failed, allowing message");
                return Ok(());
            }
        }

        // Two requests can both miss the marker; only the first to set it passes.
        match self
            .store
            .increment_with_expiry(&key, Duration::from_secs(secs))
            .await
        {
            Ok(count) if count > 1 => {
                debug!(key = %key, count, "Slowmode marker already set");
                Err(QuotaError::slowmode(secs, secs))
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(key = %key, error = %e, "Counting store failed, allowing message");
                Ok(())
            }
        }
    }

    /// Remaining budget for `scope_key`.
    ///
    /// This counts as a request: it increments the same counter `check` does.
    /// Store failures report the full limit.
    #[tracing::instrument(skip(self))]
    pub async fn get_remaining_requests(&self, scope_key: &str, cfg: &LimitConfig) -> u32 {
        if !self.config.enabled {
            return cfg.limit;
        }

        let key = self.build_key(scope_key);
        match self.store.increment_with_expiry(&key, cfg.window).await {
            Ok(count) => {
                let remaining = i64::from(cfg.limit) - count + 1;
                remaining.clamp(0, i64::from(cfg.limit)) as u32
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Counting store failed, reporting full limit");
                cfg.limit
            }
        }
    }

    /// Budget snapshot for response headers.
    ///
    /// `reset_at` is now plus one window, not the true end of the current window.
    pub async fn get_info(&self, scope_key: &str, cfg: &LimitConfig) -> RateLimitInfo {
        let remaining = self.get_remaining_requests(scope_key, cfg).await;
        let now = Utc::now();
        let reset_at = TimeDelta::from_std(cfg.window)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(now);

        RateLimitInfo {
            limit: cfg.limit,
            remaining,
            reset_at,
        }
    }

    /// Builds a counting key with the configured prefix.
    fn build_key(&self, scope_key: &str) -> String {
        let mut key = String::with_capacity(KEY_CAPACITY);
        key.push_str(&self.config.key_prefix);
        key.push(':');
        key.push_str(scope_key);
        key
    }
}

/// `user:<id>:<action>`
pub fn user_scope(user_id: Uuid, action: RateLimitAction) -> String {
    format!("user:{user_id}:{action}")
}

/// `channel:<channel_id>:<user_id>:<action>`
pub fn channel_scope(user_id: Uuid, channel_id: Uuid, action: RateLimitAction) -> String {
    format!("channel:{channel_id}:{user_id}:{action}")
}

/// `ip:<normalized addr>:<action>`
pub fn ip_scope(ip: IpAddr, action: RateLimitAction) -> String {
    format!("ip:{}:{action}", normalize_ip(ip))
}

/// `slowmode:<channel_id>:<user_id>`
pub fn slowmode_scope(user_id: Uuid, channel_id: Uuid) -> String {
    format!("slowmode:{channel_id}:{user_id}")
}
