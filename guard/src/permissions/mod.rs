//! Permission system types and utilities.
//!
//! Permissions are a 64-bit flag set composed from the @everyone role, the
//! member's assigned roles, and per-channel overrides.

pub mod flags;
pub mod models;
pub mod resolver;

pub use flags::{has_permission, Permissions};
pub use models::*;
pub use resolver::{
    can_manage_role, can_moderate_member, highest_role_position, require_permission, resolve,
    PermissionContext, PermissionError,
};
