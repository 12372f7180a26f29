//! Value objects consumed by the permission resolver.
//!
//! These are built per request by the persistence layer; the resolver never
//! loads or stores them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::flags::Permissions;

/// A server (tenant). The owner is a super-actor independent of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: Uuid,
    pub owner_id: Uuid,
}

/// Server role with permissions.
///
/// The default (@everyone) role shares its identifier with the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub server_id: Uuid,
    pub name: String,
    pub permissions: Permissions,
    /// Lower number = higher rank.
    pub position: i32,
    pub is_default: bool,
}

impl Role {
    /// Build the implicit @everyone role for a server.
    #[must_use]
    pub fn everyone(server_id: Uuid, permissions: Permissions) -> Self {
        Self {
            id: server_id,
            server_id,
            name: "@everyone".to_string(),
            permissions,
            position: i32::MAX,
            is_default: true,
        }
    }

    /// Whether this is the default role of `server`.
    #[must_use]
    pub fn is_default_for(&self, server: &Server) -> bool {
        self.id == server.id
    }
}

/// Server membership of a user.
///
/// `roles` never lists the default role; every member holds it implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Uuid,
    pub server_id: Uuid,
    pub roles: Vec<Uuid>,
}

impl Member {
    #[must_use]
    pub fn has_role(&self, role_id: Uuid) -> bool {
        self.roles.contains(&role_id)
    }
}

/// A channel within a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub server_id: Uuid,
    /// Seconds between messages per user; zero or negative disables slowmode.
    pub slowmode_secs: i64,
}

/// What a channel override applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum OverrideTarget {
    Role(Uuid),
    User(Uuid),
}

/// Channel permission override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub channel_id: Uuid,
    pub target: OverrideTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl PermissionOverride {
    /// Apply this override to a mask: deny first, then allow.
    #[must_use]
    pub fn apply(&self, perms: Permissions) -> Permissions {
        (perms - self.deny) | self.allow
    }

    /// Whether `allow` and `deny` share bits.
    ///
    /// Such overrides are still applied deny-then-allow, so the allow side wins.
    #[must_use]
    pub fn has_conflict(&self) -> bool {
        self.allow.intersects(self.deny)
    }
}
