//! Rate limiting constants.

/// Namespace every counting key starts with.
pub const DEFAULT_KEY_PREFIX: &str = "ratelimit";

/// Key pre-allocation size
pub const KEY_CAPACITY: usize = 96;

/// IPv6 addresses are limited per /64 allocation
pub const IPV6_PREFIX_LEN: u32 = 64;

/// Response headers describing the caller's budget
pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";
