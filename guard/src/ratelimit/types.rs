//! Rate limiting types.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ratelimit::constants::{HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET};

/// Actions with their own rate limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAction {
    /// Any authenticated API call
    Api,
    /// Login and registration attempts
    Auth,
    /// File uploads
    Upload,
    MessageSend,
    MessageEdit,
    Reaction,
    ServerCreate,
    InviteCreate,
}

impl RateLimitAction {
    /// Returns the string identifier for this action (used in counting keys).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Auth => "auth",
            Self::Upload => "upload",
            Self::MessageSend => "message_send",
            Self::MessageEdit => "message_edit",
            Self::Reaction => "reaction",
            Self::ServerCreate => "server_create",
            Self::InviteCreate => "invite_create",
        }
    }

    pub const fn all() -> &'static [RateLimitAction] {
        &[
            Self::Api,
            Self::Auth,
            Self::Upload,
            Self::MessageSend,
            Self::MessageEdit,
            Self::Reaction,
            Self::ServerCreate,
            Self::InviteCreate,
        ]
    }

    /// Environment variable overriding this action's policy.
    pub fn env_var(&self) -> String {
        format!("RATE_LIMIT_{}", self.as_str().to_ascii_uppercase())
    }
}

impl std::fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-facing view of a key's budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// When the window is expected to reset
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// `X-RateLimit-*` response headers. The reset is a Unix timestamp.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(
            HeaderName::from_static(HEADER_LIMIT),
            HeaderValue::from(self.limit),
        );
        headers.insert(
            HeaderName::from_static(HEADER_REMAINING),
            HeaderValue::from(self.remaining),
        );
        headers.insert(
            HeaderName::from_static(HEADER_RESET),
            HeaderValue::from(self.reset_at.timestamp()),
        );
        headers
    }
}
