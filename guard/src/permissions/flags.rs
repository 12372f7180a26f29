//! Server-level permissions using bitflags.
//!
//! Permissions are organized into categories:
//! - Content (bits 0-4): Message and media permissions
//! - Voice (bits 5-9): Voice channel permissions
//! - Moderation (bits 10-13): Member management permissions
//! - Server Management (bits 14-18): Administrative permissions
//! - Invites (bits 19-20): Invite-related permissions
//! - Pages, Screen Sharing, Mentions, Visibility (bits 21-24)
//! - History, Webhooks, Threads, Emojis (bits 25-29)
//! - Administrator (bit 62): bypasses every check and every channel override
//!
//! Bit 62 keeps `ADMINISTRATOR` inside the positive range of a signed 64-bit
//! column while leaving the middle of the mask free for new permissions.

use bitflags::bitflags;

bitflags! {
    /// Server permissions represented as a 64-bit bitfield.
    ///
    /// Stored as BIGINT by the persistence layer and serialized as the raw
    /// integer mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        // === Content (bits 0-4) ===
        /// Send text messages in channels
        const SEND_MESSAGES        = 1 << 0;
        /// Embed links in messages (auto-preview)
        const EMBED_LINKS          = 1 << 1;
        /// Attach files to messages
        const ATTACH_FILES         = 1 << 2;
        /// Use custom emoji
        const USE_EMOJI            = 1 << 3;
        /// Add reactions to messages
        const ADD_REACTIONS        = 1 << 4;

        // === Voice (bits 5-9) ===
        const VOICE_CONNECT        = 1 << 5;
        const VOICE_SPEAK          = 1 << 6;
        const VOICE_MUTE_OTHERS    = 1 << 7;
        const VOICE_DEAFEN_OTHERS  = 1 << 8;
        const VOICE_MOVE_MEMBERS   = 1 << 9;

        // === Moderation (bits 10-13) ===
        /// Delete messages from other members
        const MANAGE_MESSAGES      = 1 << 10;
        /// Timeout members (temporary mute)
        const TIMEOUT_MEMBERS      = 1 << 11;
        /// Kick members from the server
        const KICK_MEMBERS         = 1 << 12;
        /// Ban members from the server
        const BAN_MEMBERS          = 1 << 13;

        // === Server Management (bits 14-18) ===
        const MANAGE_CHANNELS      = 1 << 14;
        const MANAGE_ROLES         = 1 << 15;
        const VIEW_AUDIT_LOG       = 1 << 16;
        const MANAGE_SERVER        = 1 << 17;
        /// Transfer server ownership (owner only in practice)
        const TRANSFER_OWNERSHIP   = 1 << 18;

        // === Invites (bits 19-20) ===
        const CREATE_INVITE        = 1 << 19;
        const MANAGE_INVITES       = 1 << 20;

        // === Pages (bit 21) ===
        /// Create, edit, delete, and reorder server information pages
        const MANAGE_PAGES         = 1 << 21;

        // === Screen Sharing (bit 22) ===
        const SCREEN_SHARE         = 1 << 22;

        // === Mentions (bit 23) ===
        /// Mention @everyone and @here
        const MENTION_EVERYONE     = 1 << 23;

        // === Channel Visibility (bits 24-25) ===
        /// View a channel at all
        const VIEW_CHANNEL         = 1 << 24;
        /// Read messages sent before the member joined the channel
        const READ_MESSAGE_HISTORY = 1 << 25;

        // === Integrations (bits 26-29) ===
        const MANAGE_WEBHOOKS      = 1 << 26;
        const CREATE_THREADS       = 1 << 27;
        const MANAGE_THREADS       = 1 << 28;
        const MANAGE_EMOJIS        = 1 << 29;

        // === Administrator (bit 62) ===
        /// Grants every permission and ignores channel overrides
        const ADMINISTRATOR        = 1 << 62;
    }
}

impl Permissions {
    // === Preset Combinations ===

    /// Default permissions for the @everyone role.
    pub const EVERYONE_DEFAULT: Self = Self::SEND_MESSAGES
        .union(Self::EMBED_LINKS)
        .union(Self::ATTACH_FILES)
        .union(Self::USE_EMOJI)
        .union(Self::ADD_REACTIONS)
        .union(Self::VOICE_CONNECT)
        .union(Self::VOICE_SPEAK)
        .union(Self::CREATE_INVITE)
        .union(Self::VIEW_CHANNEL)
        .union(Self::READ_MESSAGE_HISTORY)
        .union(Self::CREATE_THREADS);

    /// Default permissions for moderators.
    pub const MODERATOR_DEFAULT: Self = Self::EVERYONE_DEFAULT
        .union(Self::VOICE_MUTE_OTHERS)
        .union(Self::VOICE_DEAFEN_OTHERS)
        .union(Self::VOICE_MOVE_MEMBERS)
        .union(Self::MANAGE_MESSAGES)
        .union(Self::TIMEOUT_MEMBERS)
        .union(Self::KICK_MEMBERS)
        .union(Self::VIEW_AUDIT_LOG)
        .union(Self::MANAGE_INVITES)
        .union(Self::SCREEN_SHARE)
        .union(Self::MENTION_EVERYONE)
        .union(Self::MANAGE_THREADS);

    /// Default permissions for officers (senior moderators).
    pub const OFFICER_DEFAULT: Self = Self::MODERATOR_DEFAULT
        .union(Self::BAN_MEMBERS)
        .union(Self::MANAGE_CHANNELS)
        .union(Self::MANAGE_PAGES)
        .union(Self::MANAGE_WEBHOOKS)
        .union(Self::MANAGE_EMOJIS);

    /// Permissions that @everyone can never hold.
    ///
    /// Used for validation when modifying the default role.
    pub const EVERYONE_FORBIDDEN: Self = Self::VOICE_MUTE_OTHERS
        .union(Self::VOICE_DEAFEN_OTHERS)
        .union(Self::VOICE_MOVE_MEMBERS)
        .union(Self::MANAGE_MESSAGES)
        .union(Self::TIMEOUT_MEMBERS)
        .union(Self::KICK_MEMBERS)
        .union(Self::BAN_MEMBERS)
        .union(Self::MANAGE_CHANNELS)
        .union(Self::MANAGE_ROLES)
        .union(Self::VIEW_AUDIT_LOG)
        .union(Self::MANAGE_SERVER)
        .union(Self::TRANSFER_OWNERSHIP)
        .union(Self::MANAGE_INVITES)
        .union(Self::MANAGE_PAGES)
        .union(Self::MENTION_EVERYONE)
        .union(Self::MANAGE_WEBHOOKS)
        .union(Self::MANAGE_THREADS)
        .union(Self::MANAGE_EMOJIS)
        .union(Self::ADMINISTRATOR);

    // === Database Conversion ===

    /// Create permissions from a BIGINT column value.
    ///
    /// Unknown bits are dropped so older binaries tolerate masks written by newer ones.
    #[must_use]
    pub const fn from_db(value: i64) -> Self {
        Self::from_bits_truncate(value as u64)
    }

    /// Convert permissions to a BIGINT column value.
    #[must_use]
    pub const fn to_db(self) -> i64 {
        self.bits() as i64
    }

    // === Permission Checking ===

    /// The single permission gate.
    ///
    /// True if this mask holds `ADMINISTRATOR` or every bit of `permission`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_guard::permissions::Permissions;
    ///
    /// let perms = Permissions::SEND_MESSAGES | Permissions::VOICE_CONNECT;
    /// assert!(perms.has(Permissions::SEND_MESSAGES));
    /// assert!(!perms.has(Permissions::BAN_MEMBERS));
    /// assert!(Permissions::ADMINISTRATOR.has(Permissions::BAN_MEMBERS));
    /// ```
    #[must_use]
    pub const fn has(self, permission: Self) -> bool {
        self.contains(Self::ADMINISTRATOR) || self.contains(permission)
    }

    /// Whether the administrator bit is set.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        self.contains(Self::ADMINISTRATOR)
    }

    /// Validate that these permissions are safe for the @everyone role.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_guard::permissions::Permissions;
    ///
    /// let safe = Permissions::SEND_MESSAGES | Permissions::VOICE_CONNECT;
    /// assert!(safe.validate_for_everyone());
    ///
    /// let unsafe_perms = Permissions::SEND_MESSAGES | Permissions::BAN_MEMBERS;
    /// assert!(!unsafe_perms.validate_for_everyone());
    /// ```
    #[must_use]
    pub const fn validate_for_everyone(self) -> bool {
        !self.intersects(Self::EVERYONE_FORBIDDEN)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<i64> for Permissions {
    fn from(value: i64) -> Self {
        Self::from_db(value)
    }
}

impl serde::Serialize for Permissions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> serde::Deserialize<'de> for Permissions {
    /// Unknown bits are dropped, as in [`Permissions::from_db`].
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = <u64 as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

/// Free-function form of [`Permissions::has`].
#[must_use]
pub const fn has_permission(mask: Permissions, permission: Permissions) -> bool {
    mask.has(permission)
}
