//! Instance-wide quotas.
//!
//! Static ceilings on storage, upload size, message length, and resource
//! counts, plus the typed denial values shared with the rate limiter.

pub mod config;
pub mod engine;
pub mod error;

pub use config::{bytes_to_mb, is_unlimited, QuotaConfig, QuotaProfile, BYTES_PER_MB};
pub use engine::QuotaEngine;
pub use error::{
    FileTooLarge, QuotaError, QuotaErrorBody, QuotaErrorKind, QuotaExceeded, QuotaResource,
    QuotaUnit, RateLimited,
};
