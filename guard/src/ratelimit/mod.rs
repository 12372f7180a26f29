//! Fixed-window rate limiting.
//!
//! Limits are keyed per user, per user and channel, or per source address,
//! and counted in a [`CountingStore`](crate::store::CountingStore). Channel
//! slowmode is a separate one-message-per-interval gate on the same store.

pub mod config;
pub mod constants;
pub mod ip;
pub mod limiter;
pub mod types;

pub use config::{ConfigError, LimitConfig, RateLimitConfig, RateLimitPolicies};
pub use ip::normalize_ip;
pub use limiter::{channel_scope, ip_scope, slowmode_scope, user_scope, RateLimiter};
pub use types::{RateLimitAction, RateLimitInfo};
