//! Guard Configuration
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::quota::QuotaConfig;
use crate::ratelimit::RateLimitConfig;
use crate::store::redis::DEFAULT_STORE_TIMEOUT;

/// Guard configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL for the counting store
    pub redis_url: String,

    /// Upper bound on a single counting store round-trip (default: 250ms)
    pub store_timeout: Duration,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// Quota ceilings
    pub quotas: QuotaConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let store_timeout = match env::var("COUNTING_STORE_TIMEOUT_MS") {
            Ok(val) => Duration::from_millis(
                val.trim()
                    .parse()
                    .with_context(|| format!("COUNTING_STORE_TIMEOUT_MS is not a number: {val}"))?,
            ),
            Err(_) => DEFAULT_STORE_TIMEOUT,
        };

        Ok(Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into()),
            store_timeout,
            rate_limit: RateLimitConfig::from_env(),
            quotas: QuotaConfig::from_env(),
        })
    }

    /// Load a `.env` file if present, then read the environment.
    pub fn from_dotenv() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Create a default configuration for testing.
    pub fn default_for_test() -> Self {
        Self {
            redis_url: "redis://localhost:6379".into(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            rate_limit: RateLimitConfig::default(),
            quotas: QuotaConfig::default(),
        }
    }
}
