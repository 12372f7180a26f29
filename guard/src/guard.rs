//! Per-action authorization pipeline.
//!
//! Every write path runs the same three gates in order: permission, rate
//! limit (plus slowmode for messages), then quota. A permission denial stops
//! before anything is counted against the actor's rate budget.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::response::{IntoResponse, Response};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::permissions::{
    require_permission, Channel, PermissionContext, PermissionError, Permissions,
};
use crate::quota::{QuotaEngine, QuotaError};
use crate::ratelimit::{RateLimitAction, RateLimiter};
use crate::store::RedisCountingStore;

/// Denial from any stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Quota(#[from] QuotaError),
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        match self {
            Self::Permission(e) => e.into_response(),
            Self::Quota(e) => e.into_response(),
        }
    }
}

/// Storage already used by the uploader and the target server, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    pub user_bytes: u64,
    pub server_bytes: u64,
}

/// Runs permission, rate and quota checks for a single action.
#[derive(Debug, Clone)]
pub struct ActionGuard {
    limiter: RateLimiter,
    quotas: QuotaEngine,
}

impl ActionGuard {
    pub fn new(limiter: RateLimiter, quotas: QuotaEngine) -> Self {
        Self { limiter, quotas }
    }

    /// Connect the Redis counting store and build a guard from `config`.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let store = RedisCountingStore::connect(&config.redis_url, config.store_timeout)
            .await
            .context("Failed to connect counting store")?;

        Ok(Self::new(
            RateLimiter::new(Arc::new(store), config.rate_limit.clone()),
            QuotaEngine::new(config.quotas.clone()),
        ))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn quotas(&self) -> &QuotaEngine {
        &self.quotas
    }

    /// Resolve the actor's permissions and require `required`.
    ///
    /// With a channel, its overrides apply. Returns the effective mask.
    pub fn authorize(
        &self,
        ctx: &PermissionContext<'_>,
        channel: Option<&Channel>,
        required: Permissions,
    ) -> Result<Permissions, AccessError> {
        if ctx.member.server_id != ctx.server.id {
            return Err(PermissionError::NotServerMember.into());
        }
        if let Some(channel) = channel {
            if channel.server_id != ctx.server.id {
                return Err(PermissionError::NotServerMember.into());
            }
        }

        let perms = match channel {
            Some(channel) => ctx.channel_permissions(channel),
            None => ctx.server_permissions(),
        };
        if let Err(e) = require_permission(perms, required) {
            debug!(
                user_id = %ctx.user_id(),
                server_id = %ctx.server.id,
                required = ?required,
                "Permission denied"
            );
            return Err(e.into());
        }
        Ok(perms)
    }

    /// Sending a message in `channel`.
    ///
    /// Members with `MANAGE_MESSAGES` in the channel skip slowmode. The
    /// length check runs last, so a rejected oversized message still starts
    /// the slowmode interval; clients should validate length before sending.
    #[tracing::instrument(skip(self, ctx, content), fields(user_id = %ctx.user_id(), channel_id = %channel.id))]
    pub async fn authorize_message(
        &self,
        ctx: &PermissionContext<'_>,
        channel: &Channel,
        content: &str,
    ) -> Result<(), AccessError> {
        let perms = self.authorize(ctx, Some(channel), Permissions::SEND_MESSAGES)?;
        let user_id = ctx.user_id();

        let policy = self.limiter.policy(RateLimitAction::MessageSend);
        self.limiter
            .check_channel(user_id, channel.id, RateLimitAction::MessageSend, &policy)
            .await?;

        if !perms.has(Permissions::MANAGE_MESSAGES) {
            self.limiter
                .check_slowmode(user_id, channel.id, channel.slowmode_secs)
                .await?;
        }

        self.quotas.check_message_length(content)?;
        Ok(())
    }

    /// Editing one of the actor's own messages in `channel`.
    #[tracing::instrument(skip(self, ctx, content), fields(user_id = %ctx.user_id(), channel_id = %channel.id))]
    pub async fn authorize_message_edit(
        &self,
        ctx: &PermissionContext<'_>,
        channel: &Channel,
        content: &str,
    ) -> Result<(), AccessError> {
        self.authorize(ctx, Some(channel), Permissions::SEND_MESSAGES)?;

        let policy = self.limiter.policy(RateLimitAction::MessageEdit);
        self.limiter
            .check_user(ctx.user_id(), RateLimitAction::MessageEdit, &policy)
            .await?;

        self.quotas.check_message_length(content)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx), fields(user_id = %ctx.user_id(), channel_id = %channel.id))]
    pub async fn authorize_reaction(
        &self,
        ctx: &PermissionContext<'_>,
        channel: &Channel,
    ) -> Result<(), AccessError> {
        self.authorize(ctx, Some(channel), Permissions::ADD_REACTIONS)?;

        let policy = self.limiter.policy(RateLimitAction::Reaction);
        self.limiter
            .check_user(ctx.user_id(), RateLimitAction::Reaction, &policy)
            .await?;
        Ok(())
    }

    /// Uploading `size_bytes` as an attachment in `channel`.
    #[tracing::instrument(skip(self, ctx), fields(user_id = %ctx.user_id(), channel_id = %channel.id))]
    pub async fn authorize_upload(
        &self,
        ctx: &PermissionContext<'_>,
        channel: &Channel,
        size_bytes: u64,
        usage: StorageUsage,
    ) -> Result<(), AccessError> {
        self.authorize(ctx, Some(channel), Permissions::ATTACH_FILES)?;

        let policy = self.limiter.policy(RateLimitAction::Upload);
        self.limiter
            .check_user(ctx.user_id(), RateLimitAction::Upload, &policy)
            .await?;

        self.quotas.check_file_size(size_bytes)?;
        self.quotas.check_user_storage(usage.user_bytes, size_bytes)?;
        self.quotas
            .check_server_storage(usage.server_bytes, size_bytes)?;
        Ok(())
    }

    /// Creating a server invite.
    #[tracing::instrument(skip(self, ctx), fields(user_id = %ctx.user_id(), server_id = %ctx.server.id))]
    pub async fn authorize_invite(&self, ctx: &PermissionContext<'_>) -> Result<(), AccessError> {
        self.authorize(ctx, None, Permissions::CREATE_INVITE)?;

        let policy = self.limiter.policy(RateLimitAction::InviteCreate);
        self.limiter
            .check_user(ctx.user_id(), RateLimitAction::InviteCreate, &policy)
            .await?;
        Ok(())
    }

    /// Creating a new server. No membership exists yet, so only rate and
    /// quota apply.
    #[tracing::instrument(skip(self))]
    pub async fn authorize_server_creation(
        &self,
        user_id: Uuid,
        servers_owned: u64,
    ) -> Result<(), AccessError> {
        let policy = self.limiter.policy(RateLimitAction::ServerCreate);
        self.limiter
            .check_user(user_id, RateLimitAction::ServerCreate, &policy)
            .await?;

        self.quotas.check_servers_owned(servers_owned)?;
        Ok(())
    }

    /// Login or registration attempt, keyed by source address.
    #[tracing::instrument(skip(self))]
    pub async fn authorize_auth_attempt(&self, ip: IpAddr) -> Result<(), AccessError> {
        let policy = self.limiter.policy(RateLimitAction::Auth);
        self.limiter
            .check_ip(ip, RateLimitAction::Auth, &policy)
            .await?;
        Ok(())
    }

    /// General authenticated API budget.
    #[tracing::instrument(skip(self))]
    pub async fn authorize_api_call(&self, user_id: Uuid) -> Result<(), AccessError> {
        let policy = self.limiter.policy(RateLimitAction::Api);
        self.limiter
            .check_user(user_id, RateLimitAction::Api, &policy)
            .await?;
        Ok(())
    }
}
