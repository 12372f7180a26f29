//! Rate limiting configuration.

use std::time::Duration;

use tracing::warn;

use crate::ratelimit::constants::DEFAULT_KEY_PREFIX;
use crate::ratelimit::RateLimitAction;

/// Invalid limit definitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Rate limit must allow at least one request")]
    ZeroLimit,

    #[error("Rate limit window must be longer than zero")]
    ZeroWindow,

    #[error("Invalid rate limit definition {0:?}, expected \"requests,window_secs\"")]
    Malformed(String),
}

/// A single fixed-window limit: at most `limit` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    pub limit: u32,
    pub window: Duration,
}

impl LimitConfig {
    /// Validated constructor.
    pub const fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { limit, window })
    }

    pub const fn per_seconds(limit: u32, secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(secs),
        }
    }

    pub const fn per_minute(limit: u32) -> Self {
        Self::per_seconds(limit, 60)
    }

    pub const fn per_hour(limit: u32) -> Self {
        Self::per_seconds(limit, 3600)
    }

    pub const fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

impl std::str::FromStr for LimitConfig {
    type Err = ConfigError;

    /// Parses `"requests,window_secs"`.
    fn from_str(val: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::Malformed(val.to_string());
        let (requests, window) = val.split_once(',').ok_or_else(malformed)?;
        let requests: u32 = requests.trim().parse().map_err(|_| malformed())?;
        let window_secs: u64 = window.trim().parse().map_err(|_| malformed())?;

        Self::new(requests, Duration::from_secs(window_secs))
    }
}

/// Predefined per-action policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicies {
    /// General API calls
    pub api: LimitConfig,
    /// Login and registration (keyed by IP)
    pub auth: LimitConfig,
    pub upload: LimitConfig,
    pub message_send: LimitConfig,
    pub message_edit: LimitConfig,
    pub reaction: LimitConfig,
    pub server_create: LimitConfig,
    pub invite_create: LimitConfig,
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            api: LimitConfig::per_minute(100),
            auth: LimitConfig::per_minute(5),
            upload: LimitConfig::per_minute(10),
            message_send: LimitConfig::per_seconds(5, 5),
            message_edit: LimitConfig::per_minute(10),
            reaction: LimitConfig::per_minute(20),
            server_create: LimitConfig::per_hour(10),
            invite_create: LimitConfig::per_minute(10),
        }
    }
}

impl RateLimitPolicies {
    /// Policy for an action.
    pub const fn get(&self, action: RateLimitAction) -> LimitConfig {
        match action {
            RateLimitAction::Api => self.api,
            RateLimitAction::Auth => self.auth,
            RateLimitAction::Upload => self.upload,
            RateLimitAction::MessageSend => self.message_send,
            RateLimitAction::MessageEdit => self.message_edit,
            RateLimitAction::Reaction => self.reaction,
            RateLimitAction::ServerCreate => self.server_create,
            RateLimitAction::InviteCreate => self.invite_create,
        }
    }

    fn get_mut(&mut self, action: RateLimitAction) -> &mut LimitConfig {
        match action {
            RateLimitAction::Api => &mut self.api,
            RateLimitAction::Auth => &mut self.auth,
            RateLimitAction::Upload => &mut self.upload,
            RateLimitAction::MessageSend => &mut self.message_send,
            RateLimitAction::MessageEdit => &mut self.message_edit,
            RateLimitAction::Reaction => &mut self.reaction,
            RateLimitAction::ServerCreate => &mut self.server_create,
            RateLimitAction::InviteCreate => &mut self.invite_create,
        }
    }
}

/// Configuration for the rate limiting system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Namespace for counting keys (e.g., "ratelimit")
    pub key_prefix: String,
    /// Per-action policies
    pub policies: RateLimitPolicies,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            policies: RateLimitPolicies::default(),
        }
    }
}

impl RateLimitConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RATE_LIMIT_ENABLED`: Enable/disable rate limiting (default: true)
    /// - `RATE_LIMIT_PREFIX`: Counting key prefix (default: "ratelimit")
    /// - `RATE_LIMIT_<ACTION>`: Policy as "requests,window_secs", where
    ///   `<ACTION>` is one of `API`, `AUTH`, `UPLOAD`, `MESSAGE_SEND`,
    ///   `MESSAGE_EDIT`, `REACTION`, `SERVER_CREATE`, `INVITE_CREATE`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RATE_LIMIT_ENABLED") {
            config.enabled = val.trim().parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_PREFIX") {
            let val = val.trim();
            if !val.is_empty() {
                config.key_prefix = val.to_string();
            }
        }

        for action in RateLimitAction::all() {
            let name = action.env_var();
            let Ok(val) = std::env::var(&name) else {
                continue;
            };
            match val.parse::<LimitConfig>() {
                Ok(limit) => *config.policies.get_mut(*action) = limit,
                Err(e) => warn!(variable = %name, error = %e, "Ignoring invalid rate limit"),
            }
        }

        config
    }
}
