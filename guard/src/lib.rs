//! Access control and abuse prevention for chat servers.
//!
//! - [`permissions`]: effective permission resolution from roles and channel overrides
//! - [`ratelimit`]: fixed-window rate limits and channel slowmode
//! - [`quota`]: instance-wide ceilings and the shared denial taxonomy
//! - [`store`]: counting store backends
//! - [`guard`]: the permission, rate, quota pipeline applied per action

pub mod config;
pub mod guard;
pub mod logging;
pub mod permissions;
pub mod quota;
pub mod ratelimit;
pub mod store;

pub use config::Config;
pub use guard::{AccessError, ActionGuard, StorageUsage};
