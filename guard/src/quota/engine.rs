//! Quota ceiling checks.
//!
//! Callers supply current usage (counted by the persistence layer); the engine
//! compares it against the configured ceilings and classifies violations.

use std::sync::Arc;

use tracing::debug;

use super::config::{bytes_to_mb, is_unlimited, QuotaConfig};
use super::error::{QuotaError, QuotaResource};

/// Resolves ceilings from a [`QuotaConfig`] and checks usage against them.
#[derive(Debug, Clone)]
pub struct QuotaEngine {
    config: Arc<QuotaConfig>,
}

impl QuotaEngine {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// The configured ceiling for `resource`, or `None` when unlimited.
    pub fn limit_for(&self, resource: QuotaResource) -> Option<u64> {
        let value = match resource {
            QuotaResource::UserStorage => self.config.max_storage_per_user_mb,
            QuotaResource::ServerStorage => self.config.max_storage_per_server_mb,
            QuotaResource::MessageLength => self.config.max_message_length,
            QuotaResource::ServersOwned => self.config.max_servers_owned,
            QuotaResource::ServersJoined => self.config.max_servers_joined,
            QuotaResource::ChannelsPerServer => self.config.max_channels_per_server,
            QuotaResource::RolesPerServer => self.config.max_roles_per_server,
            QuotaResource::MembersPerServer => self.config.max_members_per_server,
        };
        if is_unlimited(value) {
            None
        } else {
            Some(value as u64)
        }
    }

    /// Maximum upload size in bytes, or `None` when unlimited.
    pub fn max_file_size_bytes(&self) -> Option<u64> {
        let mb = self.config.max_file_size_mb;
        if is_unlimited(mb) {
            None
        } else {
            Some((mb as u64).saturating_mul(super::config::BYTES_PER_MB))
        }
    }

    fn exceeded(&self, resource: QuotaResource, used: u64, limit: u64, would_be: u64) -> QuotaError {
        debug!(
            resource = ?resource,
            used,
            limit,
            would_be,
            "Quota exceeded"
        );
        QuotaError::quota_exceeded(resource, used, limit, would_be)
            .with_upgrade_action(self.config.upgrade_action.clone())
    }

    /// Message length in characters (Unicode scalar values).
    pub fn check_message_length(&self, content: &str) -> Result<(), QuotaError> {
        let Some(limit) = self.limit_for(QuotaResource::MessageLength) else {
            return Ok(());
        };
        let length = content.chars().count() as u64;
        if length > limit {
            return Err(self.exceeded(QuotaResource::MessageLength, 0, limit, length));
        }
        Ok(())
    }

    /// Single upload size.
    pub fn check_file_size(&self, size_bytes: u64) -> Result<(), QuotaError> {
        let Some(max_bytes) = self.max_file_size_bytes() else {
            return Ok(());
        };
        if size_bytes > max_bytes {
            debug!(size_bytes, max_bytes, "Upload exceeds file size limit");
            return Err(
                QuotaError::file_too_large(size_bytes, self.config.max_file_size_mb as u64)
                    .with_upgrade_action(self.config.upgrade_action.clone()),
            );
        }
        Ok(())
    }

    /// Storing `incoming_bytes` more for a user already using `used_bytes`.
    pub fn check_user_storage(&self, used_bytes: u64, incoming_bytes: u64) -> Result<(), QuotaError> {
        self.check_storage(QuotaResource::UserStorage, used_bytes, incoming_bytes)
    }

    /// Storing `incoming_bytes` more in a server already using `used_bytes`.
    pub fn check_server_storage(
        &self,
        used_bytes: u64,
        incoming_bytes: u64,
    ) -> Result<(), QuotaError> {
        self.check_storage(QuotaResource::ServerStorage, used_bytes, incoming_bytes)
    }

    fn check_storage(
        &self,
        resource: QuotaResource,
        used_bytes: u64,
        incoming_bytes: u64,
    ) -> Result<(), QuotaError> {
        let Some(limit_mb) = self.limit_for(resource) else {
            return Ok(());
        };
        let limit_bytes = limit_mb.saturating_mul(super::config::BYTES_PER_MB);
        let would_be = used_bytes.saturating_add(incoming_bytes);
        if would_be > limit_bytes {
            return Err(self.exceeded(
                resource,
                bytes_to_mb(used_bytes),
                limit_mb,
                bytes_to_mb(would_be),
            ));
        }
        Ok(())
    }

    /// Creating one more of `resource` when `current` already exist.
    pub fn check_count(&self, resource: QuotaResource, current: u64) -> Result<(), QuotaError> {
        let Some(limit) = self.limit_for(resource) else {
            return Ok(());
        };
        let would_be = current.saturating_add(1);
        if would_be > limit {
            return Err(self.exceeded(resource, current, limit, would_be));
        }
        Ok(())
    }

    pub fn check_servers_owned(&self, current: u64) -> Result<(), QuotaError> {
        self.check_count(QuotaResource::ServersOwned, current)
    }

    pub fn check_servers_joined(&self, current: u64) -> Result<(), QuotaError> {
        self.check_count(QuotaResource::ServersJoined, current)
    }

    pub fn check_channels(&self, current: u64) -> Result<(), QuotaError> {
        self.check_count(QuotaResource::ChannelsPerServer, current)
    }

    pub fn check_roles(&self, current: u64) -> Result<(), QuotaError> {
        self.check_count(QuotaResource::RolesPerServer, current)
    }

    pub fn check_members(&self, current: u64) -> Result<(), QuotaError> {
        self.check_count(QuotaResource::MembersPerServer, current)
    }
}

impl Default for QuotaEngine {
    fn default() -> Self {
        Self::new(QuotaConfig::default())
    }
}
