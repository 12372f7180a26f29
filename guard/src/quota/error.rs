//! Quota and rate-limit denial types.
//!
//! Every denial is a variant with a strongly typed payload, rendered for
//! clients as `{ "error", "message", "details", "retry_after"?, "upgrade_action"? }`.

use std::fmt;
use std::time::Duration;

use axum::http::header::{HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::config::bytes_to_mb;

/// Machine-readable denial kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaErrorKind {
    QuotaExceeded,
    RateLimited,
    FileTooLarge,
}

impl QuotaErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota_exceeded",
            Self::RateLimited => "rate_limited",
            Self::FileTooLarge => "file_too_large",
        }
    }
}

/// Unit a quota is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaUnit {
    Megabytes,
    Characters,
    Count,
}

impl QuotaUnit {
    const fn label(self) -> &'static str {
        match self {
            Self::Megabytes => "MB",
            Self::Characters => "characters",
            Self::Count => "",
        }
    }
}

/// Resource a quota ceiling applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaResource {
    UserStorage,
    ServerStorage,
    MessageLength,
    ServersOwned,
    ServersJoined,
    ChannelsPerServer,
    RolesPerServer,
    MembersPerServer,
}

impl QuotaResource {
    pub const fn unit(self) -> QuotaUnit {
        match self {
            Self::UserStorage | Self::ServerStorage => QuotaUnit::Megabytes,
            Self::MessageLength => QuotaUnit::Characters,
            Self::ServersOwned
            | Self::ServersJoined
            | Self::ChannelsPerServer
            | Self::RolesPerServer
            | Self::MembersPerServer => QuotaUnit::Count,
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::UserStorage => "Storage",
            Self::ServerStorage => "Server storage",
            Self::MessageLength => "Message length",
            Self::ServersOwned => "Owned servers",
            Self::ServersJoined => "Joined servers",
            Self::ChannelsPerServer => "Channels",
            Self::RolesPerServer => "Roles",
            Self::MembersPerServer => "Members",
        }
    }
}

/// Payload of a [`QuotaError::QuotaExceeded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaExceeded {
    pub resource: QuotaResource,
    pub unit: QuotaUnit,
    /// Amount already consumed.
    pub used: u64,
    pub limit: u64,
    /// Amount consumed had the action been admitted.
    pub would_be: u64,
}

/// Payload of a [`QuotaError::RateLimited`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimited {
    pub limit: u32,
    pub window_secs: u64,
    /// Set when the denial came from channel slowmode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slowmode_secs: Option<u64>,
}

/// Payload of a [`QuotaError::FileTooLarge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTooLarge {
    pub size_bytes: u64,
    pub size_mb: u64,
    pub limit_mb: u64,
}

/// A quota, rate, or size ceiling denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    QuotaExceeded {
        details: QuotaExceeded,
        upgrade_action: Option<String>,
    },
    RateLimited {
        details: RateLimited,
        retry_after: u64,
    },
    FileTooLarge {
        details: FileTooLarge,
        upgrade_action: Option<String>,
    },
}

impl QuotaError {
    pub fn quota_exceeded(resource: QuotaResource, used: u64, limit: u64, would_be: u64) -> Self {
        Self::QuotaExceeded {
            details: QuotaExceeded {
                resource,
                unit: resource.unit(),
                used,
                limit,
                would_be,
            },
            upgrade_action: None,
        }
    }

    pub fn rate_limited(limit: u32, window: Duration, retry_after: u64) -> Self {
        Self::RateLimited {
            details: RateLimited {
                limit,
                window_secs: window.as_secs(),
                slowmode_secs: None,
            },
            retry_after,
        }
    }

    /// One message per `slowmode_secs` in a channel.
    pub fn slowmode(slowmode_secs: u64, retry_after: u64) -> Self {
        Self::RateLimited {
            details: RateLimited {
                limit: 1,
                window_secs: slowmode_secs,
                slowmode_secs: Some(slowmode_secs),
            },
            retry_after,
        }
    }

    pub fn file_too_large(size_bytes: u64, limit_mb: u64) -> Self {
        Self::FileTooLarge {
            details: FileTooLarge {
                size_bytes,
                size_mb: bytes_to_mb(size_bytes),
                limit_mb,
            },
            upgrade_action: None,
        }
    }

    /// Attach an upgrade hint. Rate limits never carry one.
    #[must_use]
    pub fn with_upgrade_action(mut self, action: Option<String>) -> Self {
        match &mut self {
            Self::QuotaExceeded { upgrade_action, .. } | Self::FileTooLarge { upgrade_action, .. } => {
                *upgrade_action = action;
            }
            Self::RateLimited { .. } => {}
        }
        self
    }

    pub const fn kind(&self) -> QuotaErrorKind {
        match self {
            Self::QuotaExceeded { .. } => QuotaErrorKind::QuotaExceeded,
            Self::RateLimited { .. } => QuotaErrorKind::RateLimited,
            Self::FileTooLarge { .. } => QuotaErrorKind::FileTooLarge,
        }
    }

    pub const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    pub fn upgrade_action(&self) -> Option<&str> {
        match self {
            Self::QuotaExceeded { upgrade_action, .. } | Self::FileTooLarge { upgrade_action, .. } => {
                upgrade_action.as_deref()
            }
            Self::RateLimited { .. } => None,
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Client-facing JSON body.
    pub fn body(&self) -> QuotaErrorBody<'_> {
        let details = match self {
            Self::QuotaExceeded { details, .. } => QuotaDetails::QuotaExceeded(details),
            Self::RateLimited { details, .. } => QuotaDetails::RateLimited(details),
            Self::FileTooLarge { details, .. } => QuotaDetails::FileTooLarge(details),
        };

        QuotaErrorBody {
            error: self.kind(),
            message: self.to_string(),
            details,
            retry_after: self.retry_after(),
            upgrade_action: self.upgrade_action(),
        }
    }
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded { details, .. } => {
                let unit = details.unit.label();
                write!(
                    f,
                    "{} limit reached: {}{sep}{unit} used of {}{sep}{unit}, this action would bring it to {}{sep}{unit}",
                    details.resource.description(),
                    details.used,
                    details.limit,
                    details.would_be,
                    sep = if unit.is_empty() { "" } else { " " },
                )
            }
            Self::RateLimited {
                details,
                retry_after,
            } => match details.slowmode_secs {
                Some(secs) => write!(
                    f,
                    "Slowmode is enabled: one message every {secs} seconds. Wait {retry_after} seconds."
                ),
                None => write!(
                    f,
                    "Too many requests: limit is {} per {} seconds. Wait {retry_after} seconds.",
                    details.limit, details.window_secs
                ),
            },
            Self::FileTooLarge { details, .. } => write!(
                f,
                "File is {} MB, the maximum is {} MB",
                details.size_mb, details.limit_mb
            ),
        }
    }
}

impl std::error::Error for QuotaError {}

/// Typed details, borrowed from the error.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuotaDetails<'a> {
    QuotaExceeded(&'a QuotaExceeded),
    RateLimited(&'a RateLimited),
    FileTooLarge(&'a FileTooLarge),
}

/// JSON response body for quota errors.
#[derive(Debug, Serialize)]
pub struct QuotaErrorBody<'a> {
    pub error: QuotaErrorKind,
    pub message: String,
    pub details: QuotaDetails<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_action: Option<&'a str>,
}

impl IntoResponse for QuotaError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(self.body())).into_response();

        if let Some(retry_after) = self.retry_after() {
            if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, v);
            }
        }

        response
    }
}
