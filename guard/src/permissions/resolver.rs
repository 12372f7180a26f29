//! Permission resolution logic.
//!
//! Computes effective permissions for a member in a server/channel context.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;
use uuid::Uuid;

use super::flags::Permissions;
use super::models::{Channel, Member, OverrideTarget, PermissionOverride, Role, Server};

/// Compute the effective permissions of a member.
///
/// Resolution order:
/// 1. Server owner has all permissions
/// 2. Start with @everyone role permissions (empty if the role is missing)
/// 3. OR in every assigned role
/// 4. Administrator short-circuits to all permissions
/// 5. With a channel, apply overrides: @everyone, then member roles in
///    role-list order, then the member's own user override
///
/// Every override is applied as `(perms & !deny) | allow`.
pub fn resolve(
    member: &Member,
    roles: &[Role],
    server: &Server,
    channel: Option<&Channel>,
    overrides: &[PermissionOverride],
) -> Permissions {
    if member.user_id == server.owner_id {
        return Permissions::all();
    }

    let mut perms = match roles.iter().find(|r| r.is_default_for(server)) {
        Some(everyone) => everyone.permissions,
        None => {
            warn!(
                server_id = %server.id,
                user_id = %member.user_id,
                "Default role missing from role list, resolving with empty base permissions"
            );
            Permissions::empty()
        }
    };

    for role in roles.iter().filter(|r| member.has_role(r.id)) {
        perms |= role.permissions;
    }

    if perms.is_admin() {
        return Permissions::all();
    }

    let Some(channel) = channel else {
        return perms;
    };
    if overrides.is_empty() {
        return perms;
    }

    let for_target = |target: OverrideTarget| {
        overrides
            .iter()
            .filter(move |o| o.channel_id == channel.id && o.target == target)
    };

    for ovr in for_target(OverrideTarget::Role(server.id)) {
        perms = ovr.apply(perms);
    }

    for role in roles
        .iter()
        .filter(|r| !r.is_default_for(server) && member.has_role(r.id))
    {
        for ovr in for_target(OverrideTarget::Role(role.id)) {
            perms = ovr.apply(perms);
        }
    }

    for ovr in for_target(OverrideTarget::User(member.user_id)) {
        perms = ovr.apply(perms);
    }

    perms
}

/// Fail with [`PermissionError::MissingPermission`] unless `perms` grants `required`.
pub fn require_permission(
    perms: Permissions,
    required: Permissions,
) -> Result<(), PermissionError> {
    if perms.has(required) {
        Ok(())
    } else {
        Err(PermissionError::MissingPermission(required - perms))
    }
}

/// Rank of a member: the lowest position among its roles.
///
/// Members holding only @everyone rank last (`i32::MAX`).
pub fn highest_role_position(member: &Member, roles: &[Role]) -> i32 {
    roles
        .iter()
        .filter(|r| member.has_role(r.id))
        .map(|r| r.position)
        .min()
        .unwrap_or(i32::MAX)
}

/// Check if a member can manage a target role.
///
/// Rules:
/// 1. Must have `MANAGE_ROLES` permission
/// 2. Cannot edit roles at or above your position
/// 3. Cannot grant permissions you don't have
pub fn can_manage_role(
    actor_permissions: Permissions,
    actor_highest_position: i32,
    target_role_position: i32,
    new_permissions: Option<Permissions>,
) -> Result<(), PermissionError> {
    require_permission(actor_permissions, Permissions::MANAGE_ROLES)?;

    if target_role_position <= actor_highest_position {
        return Err(PermissionError::RoleHierarchy {
            actor_position: actor_highest_position,
            target_position: target_role_position,
        });
    }

    // Administrators may grant anything
    if actor_permissions.is_admin() {
        return Ok(());
    }

    if let Some(new_perms) = new_permissions {
        let escalation = new_perms - actor_permissions;
        if !escalation.is_empty() {
            return Err(PermissionError::CannotEscalate(escalation));
        }
    }

    Ok(())
}

/// Check if a member can moderate (kick, ban, timeout) a target member.
pub const fn can_moderate_member(
    actor_highest_position: i32,
    target_highest_position: i32,
    target_is_owner: bool,
) -> Result<(), PermissionError> {
    if target_is_owner {
        return Err(PermissionError::CannotModerateOwner);
    }

    if target_highest_position <= actor_highest_position {
        return Err(PermissionError::RoleHierarchy {
            actor_position: actor_highest_position,
            target_position: target_highest_position,
        });
    }

    Ok(())
}

/// Everything needed to resolve a member's permissions within one server.
#[derive(Debug, Clone, Copy)]
pub struct PermissionContext<'a> {
    pub server: &'a Server,
    pub member: &'a Member,
    /// Full role list of the server, including @everyone.
    pub roles: &'a [Role],
    /// Overrides of the channel being acted on (empty for server-level actions).
    pub overrides: &'a [PermissionOverride],
}

impl PermissionContext<'_> {
    pub fn user_id(&self) -> Uuid {
        self.member.user_id
    }

    pub fn is_owner(&self) -> bool {
        self.member.user_id == self.server.owner_id
    }

    /// Server-level permissions, overrides ignored.
    pub fn server_permissions(&self) -> Permissions {
        resolve(self.member, self.roles, self.server, None, &[])
    }

    /// Permissions inside `channel`.
    pub fn channel_permissions(&self, channel: &Channel) -> Permissions {
        resolve(
            self.member,
            self.roles,
            self.server,
            Some(channel),
            self.overrides,
        )
    }

    pub fn highest_position(&self) -> i32 {
        if self.is_owner() {
            return i32::MIN;
        }
        highest_role_position(self.member, self.roles)
    }
}

/// Permission check errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// Member lacks the listed permission bits.
    #[error("Missing permission: {0:?}")]
    MissingPermission(Permissions),

    /// Role hierarchy violation.
    #[error("Cannot act on position {target_position} (your position: {actor_position})")]
    RoleHierarchy {
        actor_position: i32,
        target_position: i32,
    },

    /// Attempted to grant permissions not held.
    #[error("Cannot grant permissions you don't have: {0:?}")]
    CannotEscalate(Permissions),

    /// Attempted to moderate the server owner.
    #[error("Cannot moderate server owner")]
    CannotModerateOwner,

    /// Member record belongs to a different server.
    #[error("User is not a member of this server")]
    NotServerMember,
}

impl PermissionError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingPermission(_) => "missing_permission",
            Self::RoleHierarchy { .. } => "role_hierarchy",
            Self::CannotEscalate(_) => "cannot_escalate",
            Self::CannotModerateOwner => "cannot_moderate_owner",
            Self::NotServerMember => "not_server_member",
        }
    }
}

impl IntoResponse for PermissionError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let Self::MissingPermission(missing) | Self::CannotEscalate(missing) = &self {
            body["permissions"] = serde_json::json!(missing.bits());
        }

        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        server: Server,
        everyone: Role,
    }

    impl Fixture {
        fn new(everyone_perms: Permissions) -> Self {
            let server = Server {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
            };
            Self {
                everyone: Role::everyone(server.id, everyone_perms),
                server,
            }
        }

        fn role(&self, permissions: Permissions, position: i32) -> Role {
            Role {
                id: Uuid::new_v4(),
                server_id: self.server.id,
                name: format!("role-{position}"),
                permissions,
                position,
                is_default: false,
            }
        }

        fn member(&self, roles: &[&Role]) -> Member {
            Member {
                user_id: Uuid::new_v4(),
                server_id: self.server.id,
                roles: roles.iter().map(|r| r.id).collect(),
            }
        }

        fn channel(&self) -> Channel {
            Channel {
                id: Uuid::new_v4(),
                server_id: self.server.id,
                slowmode_secs: 0,
            }
        }
    }

    fn ovr(
        channel: &Channel,
        target: OverrideTarget,
        allow: Permissions,
        deny: Permissions,
    ) -> PermissionOverride {
        PermissionOverride {
            channel_id: channel.id,
            target,
            allow,
            deny,
        }
    }

    #[test]
    fn test_owner_has_all_permissions() {
        let fx = Fixture::new(Permissions::empty());
        let owner = Member {
            user_id: fx.server.owner_id,
            server_id: fx.server.id,
            roles: vec![],
        };

        let perms = resolve(&owner, &[], &fx.server, None, &[]);

        assert_eq!(perms, Permissions::all());
        assert!(perms.is_admin());
    }

    #[test]
    fn test_owner_ignores_user_deny_override() {
        let fx = Fixture::new(Permissions::EVERYONE_DEFAULT);
        let channel = fx.channel();
        let owner = Member {
            user_id: fx.server.owner_id,
            server_id: fx.server.id,
            roles: vec![],
        };
        let deny = ovr(
            &channel,
            OverrideTarget::User(owner.user_id),
            Permissions::empty(),
            Permissions::all(),
        );

        let perms = resolve(
            &owner,
            &[fx.everyone.clone()],
            &fx.server,
            Some(&channel),
            &[deny],
        );

        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_member_without_roles_gets_everyone() {
        let fx = Fixture::new(Permissions::SEND_MESSAGES | Permissions::VOICE_CONNECT);
        let member = fx.member(&[]);

        let perms = resolve(&member, &[fx.everyone.clone()], &fx.server, None, &[]);

        assert_eq!(perms, Permissions::SEND_MESSAGES | Permissions::VOICE_CONNECT);
    }

    #[test]
    fn test_missing_default_role_yields_empty_base() {
        let fx = Fixture::new(Permissions::SEND_MESSAGES);
        let member = fx.member(&[]);

        let perms = resolve(&member, &[], &fx.server, None, &[]);

        assert!(perms.is_empty());
    }

    #[test]
    fn test_unassigned_roles_are_ignored() {
        let fx = Fixture::new(Permissions::empty());
        let assigned = fx.role(Permissions::SEND_MESSAGES, 10);
        let other = fx.role(Permissions::BAN_MEMBERS, 5);
        let member = fx.member(&[&assigned]);

        let perms = resolve(
            &member,
            &[fx.everyone.clone(), assigned, other],
            &fx.server,
            None,
            &[],
        );

        assert!(perms.has(Permissions::SEND_MESSAGES));
        assert!(!perms.has(Permissions::BAN_MEMBERS));
    }

    #[test]
    fn test_role_permissions_combined() {
        let fx = Fixture::new(Permissions::SEND_MESSAGES);
        let mod_role = fx.role(
            Permissions::MANAGE_MESSAGES | Permissions::TIMEOUT_MEMBERS,
            100,
        );
        let member = fx.member(&[&mod_role]);

        let perms = resolve(
            &member,
            &[fx.everyone.clone(), mod_role],
            &fx.server,
            None,
            &[],
        );

        assert!(perms.has(Permissions::SEND_MESSAGES));
        assert!(perms.has(Permissions::MANAGE_MESSAGES));
        assert!(perms.has(Permissions::TIMEOUT_MEMBERS));
    }

    #[test]
    fn test_administrator_role_bypasses_overrides() {
        let fx = Fixture::new(Permissions::EVERYONE_DEFAULT);
        let admin = fx.role(Permissions::ADMINISTRATOR, 1);
        let member = fx.member(&[&admin]);
        let channel = fx.channel();
        let deny_all = ovr(
            &channel,
            OverrideTarget::User(member.user_id),
            Permissions::empty(),
            Permissions::all(),
        );

        let perms = resolve(
            &member,
            &[fx.everyone.clone(), admin],
            &fx.server,
            Some(&channel),
            &[deny_all],
        );

        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_everyone_override_applies() {
        let fx = Fixture::new(Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS);
        let member = fx.member(&[]);
        let channel = fx.channel();
        let everyone_ovr = ovr(
            &channel,
            OverrideTarget::Role(fx.server.id),
            Permissions::ATTACH_FILES,
            Permissions::SEND_MESSAGES,
        );

        let perms = resolve(
            &member,
            &[fx.everyone.clone()],
            &fx.server,
            Some(&channel),
            &[everyone_ovr],
        );

        assert!(!perms.has(Permissions::SEND_MESSAGES));
        assert!(perms.has(Permissions::EMBED_LINKS));
        assert!(perms.has(Permissions::ATTACH_FILES));
    }

    #[test]
    fn test_everyone_override_denies_bits_granted_by_roles() {
        let fx = Fixture::new(Permissions::VIEW_CHANNEL);
        let speaker = fx.role(Permissions::SEND_MESSAGES, 10);
        let member = fx.member(&[&speaker]);
        let channel = fx.channel();
        let everyone_ovr = ovr(
            &channel,
            OverrideTarget::Role(fx.server.id),
            Permissions::empty(),
            Permissions::SEND_MESSAGES,
        );

        let perms = resolve(
            &member,
            &[fx.everyone.clone(), speaker],
            &fx.server,
            Some(&channel),
            &[everyone_ovr],
        );

        assert!(!perms.has(Permissions::SEND_MESSAGES));
        assert!(perms.has(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_role_override_regrants_everyone_deny() {
        let fx = Fixture::new(Permissions::SEND_MESSAGES);
        let speaker = fx.role(Permissions::empty(), 10);
        let member = fx.member(&[&speaker]);
        let channel = fx.channel();
        let overrides = [
            ovr(
                &channel,
                OverrideTarget::Role(speaker.id),
                Permissions::SEND_MESSAGES,
                Permissions::empty(),
            ),
            ovr(
                &channel,
                OverrideTarget::Role(fx.server.id),
                Permissions::empty(),
                Permissions::SEND_MESSAGES,
            ),
        ];

        let perms = resolve(
            &member,
            &[fx.everyone.clone(), speaker],
            &fx.server,
            Some(&channel),
            &overrides,
        );

        // Role override wins over @everyone override regardless of list order
        assert!(perms.has(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_user_override_wins_over_role_override() {
        let fx = Fixture::new(Permissions::empty());
        let role = fx.role(Permissions::empty(), 10);
        let member = fx.member(&[&role]);
        let channel = fx.channel();
        let overrides = [
            ovr(
                &channel,
                OverrideTarget::User(member.user_id),
                Permissions::empty(),
                Permissions::VIEW_CHANNEL,
            ),
            ovr(
                &channel,
                OverrideTarget::Role(role.id),
                Permissions::VIEW_CHANNEL,
                Permissions::empty(),
            ),
        ];

        let perms = resolve(
            &member,
            &[fx.everyone.clone(), role],
            &fx.server,
            Some(&channel),
            &overrides,
        );

        assert!(!perms.has(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_role_overrides_follow_role_list_order() {
        let fx = Fixture::new(Permissions::VIEW_CHANNEL);
        let first = fx.role(Permissions::empty(), 10);
        let second = fx.role(Permissions::empty(), 20);
        let member = fx.member(&[&first, &second]);
        let channel = fx.channel();
        let overrides = [
            ovr(
                &channel,
                OverrideTarget::Role(first.id),
                Permissions::empty(),
                Permissions::VIEW_CHANNEL,
            ),
            ovr(
                &channel,
                OverrideTarget::Role(second.id),
                Permissions::VIEW_CHANNEL,
                Permissions::empty(),
            ),
        ];

        let forward = resolve(
            &member,
            &[fx.everyone.clone(), first.clone(), second.clone()],
            &fx.server,
            Some(&channel),
            &overrides,
        );
        let reversed = resolve(
            &member,
            &[fx.everyone.clone(), second, first],
            &fx.server,
            Some(&channel),
            &overrides,
        );

        // Later role in the list applies last
        assert!(forward.has(Permissions::VIEW_CHANNEL));
        assert!(!reversed.has(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_overrides_skipped_without_channel() {
        let fx = Fixture::new(Permissions::SEND_MESSAGES);
        let member = fx.member(&[]);
        let channel = fx.channel();
        let deny = ovr(
            &channel,
            OverrideTarget::User(member.user_id),
            Permissions::empty(),
            Permissions::SEND_MESSAGES,
        );

        let perms = resolve(&member, &[fx.everyone.clone()], &fx.server, None, &[deny]);

        assert!(perms.has(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_overrides_for_other_channels_ignored() {
        let fx = Fixture::new(Permissions::SEND_MESSAGES);
        let member = fx.member(&[]);
        let channel = fx.channel();
        let elsewhere = fx.channel();
        let deny = ovr(
            &elsewhere,
            OverrideTarget::User(member.user_id),
            Permissions::empty(),
            Permissions::SEND_MESSAGES,
        );

        let perms = resolve(
            &member,
            &[fx.everyone.clone()],
            &fx.server,
            Some(&channel),
            &[deny],
        );

        assert!(perms.has(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_require_permission_reports_missing_bits() {
        let perms = Permissions::SEND_MESSAGES;

        assert!(require_permission(perms, Permissions::SEND_MESSAGES).is_ok());
        assert_eq!(
            require_permission(perms, Permissions::SEND_MESSAGES | Permissions::BAN_MEMBERS),
            Err(PermissionError::MissingPermission(Permissions::BAN_MEMBERS))
        );
        assert!(require_permission(Permissions::ADMINISTRATOR, Permissions::BAN_MEMBERS).is_ok());
    }

    #[test]
    fn test_highest_role_position() {
        let fx = Fixture::new(Permissions::empty());
        let low = fx.role(Permissions::empty(), 50);
        let high = fx.role(Permissions::empty(), 5);
        let member = fx.member(&[&low, &high]);
        let plain = fx.member(&[]);
        let roles = [fx.everyone.clone(), low, high];

        assert_eq!(highest_role_position(&member, &roles), 5);
        assert_eq!(highest_role_position(&plain, &roles), i32::MAX);
    }

    #[test]
    fn test_can_manage_role_hierarchy() {
        let perms = Permissions::MANAGE_ROLES | Permissions::KICK_MEMBERS;

        assert!(can_manage_role(perms, 50, 100, None).is_ok());
        assert!(can_manage_role(perms, 50, 50, None).is_err());
        assert!(can_manage_role(perms, 50, 10, None).is_err());
    }

    #[test]
    fn test_cannot_escalate_permissions() {
        let actor_perms = Permissions::MANAGE_ROLES | Permissions::KICK_MEMBERS;
        let new_perms = Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS;

        let result = can_manage_role(actor_perms, 50, 100, Some(new_perms));

        assert_eq!(
            result,
            Err(PermissionError::CannotEscalate(Permissions::BAN_MEMBERS))
        );
    }

    #[test]
    fn test_admin_can_grant_anything() {
        let result = can_manage_role(
            Permissions::all(),
            1,
            100,
            Some(Permissions::BAN_MEMBERS | Permissions::MANAGE_SERVER),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_manage_roles_permission() {
        let result = can_manage_role(Permissions::KICK_MEMBERS, 50, 100, None);

        assert!(matches!(result, Err(PermissionError::MissingPermission(_))));
    }

    #[test]
    fn test_moderation_rules() {
        assert_eq!(
            can_moderate_member(50, 1, true),
            Err(PermissionError::CannotModerateOwner)
        );
        assert!(can_moderate_member(50, 100, false).is_ok());
        assert!(matches!(
            can_moderate_member(50, 50, false),
            Err(PermissionError::RoleHierarchy { .. })
        ));
        assert!(matches!(
            can_moderate_member(50, 10, false),
            Err(PermissionError::RoleHierarchy { .. })
        ));
    }

    #[test]
    fn test_permission_error_display() {
        let missing = PermissionError::MissingPermission(Permissions::MANAGE_ROLES);
        assert!(missing.to_string().contains("Missing permission"));

        let hierarchy = PermissionError::RoleHierarchy {
            actor_position: 50,
            target_position: 10,
        };
        assert!(hierarchy.to_string().contains("position"));

        let owner = PermissionError::CannotModerateOwner;
        assert!(owner.to_string().contains("server owner"));

        assert_eq!(PermissionError::NotServerMember.code(), "not_server_member");
    }

    #[test]
    fn test_permission_error_is_forbidden() {
        let response =
            PermissionError::MissingPermission(Permissions::BAN_MEMBERS).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
