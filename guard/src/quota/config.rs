//! Instance-wide quota ceilings.
//!
//! Two profiles exist: `default` with concrete ceilings, and `unlimited`
//! where every ceiling is the sentinel `0`. Any non-positive value means
//! "no limit" and is never an error.

use std::env;

use tracing::warn;

/// Bytes in one megabyte, as quotas count them.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Round a byte count up to whole megabytes.
pub const fn bytes_to_mb(bytes: u64) -> u64 {
    bytes.div_ceil(BYTES_PER_MB)
}

/// Whether a configured ceiling means "no limit".
///
/// # Examples
///
/// ```
/// use vc_guard::quota::is_unlimited;
///
/// assert!(is_unlimited(0));
/// assert!(is_unlimited(-1));
/// assert!(!is_unlimited(1));
/// ```
pub const fn is_unlimited(value: i64) -> bool {
    value <= 0
}

/// Named configuration profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaProfile {
    Default,
    Unlimited,
}

impl QuotaProfile {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "unlimited" => Some(Self::Unlimited),
            _ => None,
        }
    }
}

/// Quota ceilings. Non-positive values disable the ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaConfig {
    /// Total attachment storage per user (MB)
    pub max_storage_per_user_mb: i64,
    /// Total attachment storage per server (MB)
    pub max_storage_per_server_mb: i64,
    /// Single upload size (MB)
    pub max_file_size_mb: i64,
    /// Message length (characters)
    pub max_message_length: i64,
    pub max_servers_owned: i64,
    pub max_servers_joined: i64,
    pub max_channels_per_server: i64,
    pub max_roles_per_server: i64,
    pub max_members_per_server: i64,
    /// Hint shown to clients when a ceiling could be lifted (e.g. a billing URL)
    pub upgrade_action: Option<String>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_storage_per_user_mb: 500,
            max_storage_per_server_mb: 5 * 1024,
            max_file_size_mb: 25,
            max_message_length: 2000,
            max_servers_owned: 10,
            max_servers_joined: 100,
            max_channels_per_server: 500,
            max_roles_per_server: 250,
            max_members_per_server: 10_000,
            upgrade_action: None,
        }
    }
}

impl QuotaConfig {
    /// Every ceiling disabled.
    pub const fn unlimited() -> Self {
        Self {
            max_storage_per_user_mb: 0,
            max_storage_per_server_mb: 0,
            max_file_size_mb: 0,
            max_message_length: 0,
            max_servers_owned: 0,
            max_servers_joined: 0,
            max_channels_per_server: 0,
            max_roles_per_server: 0,
            max_members_per_server: 0,
            upgrade_action: None,
        }
    }

    pub fn for_profile(profile: QuotaProfile) -> Self {
        match profile {
            QuotaProfile::Default => Self::default(),
            QuotaProfile::Unlimited => Self::unlimited(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `QUOTA_PROFILE`: `default` or `unlimited` (default: `default`)
    /// - `QUOTA_MAX_STORAGE_PER_USER_MB`, `QUOTA_MAX_STORAGE_PER_SERVER_MB`,
    ///   `QUOTA_MAX_FILE_SIZE_MB`, `QUOTA_MAX_MESSAGE_LENGTH`,
    ///   `QUOTA_MAX_SERVERS_OWNED`, `QUOTA_MAX_SERVERS_JOINED`,
    ///   `QUOTA_MAX_CHANNELS_PER_SERVER`, `QUOTA_MAX_ROLES_PER_SERVER`,
    ///   `QUOTA_MAX_MEMBERS_PER_SERVER`: override one ceiling of the profile
    /// - `QUOTA_UPGRADE_ACTION`: upgrade hint attached to quota errors
    pub fn from_env() -> Self {
        let profile = match env::var("QUOTA_PROFILE") {
            Ok(val) => QuotaProfile::parse(&val).unwrap_or_else(|| {
                warn!(value = %val, "Unknown QUOTA_PROFILE, using default");
                QuotaProfile::Default
            }),
            Err(_) => QuotaProfile::Default,
        };
        let mut config = Self::for_profile(profile);

        let overrides: [(&str, &mut i64); 9] = [
            (
                "QUOTA_MAX_STORAGE_PER_USER_MB",
                &mut config.max_storage_per_user_mb,
            ),
            (
                "QUOTA_MAX_STORAGE_PER_SERVER_MB",
                &mut config.max_storage_per_server_mb,
            ),
            ("QUOTA_MAX_FILE_SIZE_MB", &mut config.max_file_size_mb),
            ("QUOTA_MAX_MESSAGE_LENGTH", &mut config.max_message_length),
            ("QUOTA_MAX_SERVERS_OWNED", &mut config.max_servers_owned),
            ("QUOTA_MAX_SERVERS_JOINED", &mut config.max_servers_joined),
            (
                "QUOTA_MAX_CHANNELS_PER_SERVER",
                &mut config.max_channels_per_server,
            ),
            (
                "QUOTA_MAX_ROLES_PER_SERVER",
                &mut config.max_roles_per_server,
            ),
            (
                "QUOTA_MAX_MEMBERS_PER_SERVER",
                &mut config.max_members_per_server,
            ),
        ];
        for (name, slot) in overrides {
            if let Ok(val) = env::var(name) {
                match val.trim().parse() {
                    Ok(parsed) => *slot = parsed,
                    Err(_) => warn!(variable = name, value = %val, "Ignoring invalid quota value"),
                }
            }
        }

        config.upgrade_action = env::var("QUOTA_UPGRADE_ACTION")
            .ok()
            .filter(|s| !s.trim().is_empty());

        config
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const VARS: [&str; 4] = [
        "QUOTA_PROFILE",
        "QUOTA_MAX_FILE_SIZE_MB",
        "QUOTA_MAX_MESSAGE_LENGTH",
        "QUOTA_UPGRADE_ACTION",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_is_unlimited() {
        assert!(is_unlimited(0));
        assert!(is_unlimited(-1));
        assert!(is_unlimited(i64::MIN));
        assert!(!is_unlimited(1));
    }

    #[test]
    fn test_default_profile_values() {
        let config = QuotaConfig::default();

        assert_eq!(config.max_storage_per_user_mb, 500);
        assert_eq!(config.max_storage_per_server_mb, 5120);
        assert_eq!(config.max_file_size_mb, 25);
        assert_eq!(config.max_message_length, 2000);
        assert_eq!(config.max_servers_owned, 10);
    }

    #[test]
    fn test_unlimited_profile_is_all_sentinels() {
        let config = QuotaConfig::unlimited();

        assert!(is_unlimited(config.max_storage_per_user_mb));
        assert!(is_unlimited(config.max_file_size_mb));
        assert!(is_unlimited(config.max_message_length));
        assert!(is_unlimited(config.max_members_per_server));
    }

    #[test]
    fn test_bytes_to_mb_rounds_up() {
        assert_eq!(bytes_to_mb(0), 0);
        assert_eq!(bytes_to_mb(1), 1);
        assert_eq!(bytes_to_mb(BYTES_PER_MB), 1);
        assert_eq!(bytes_to_mb(BYTES_PER_MB + 1), 2);
    }

    #[test]
    #[serial]
    fn test_from_env_profile_and_overrides() {
        clear_env();
        env::set_var("QUOTA_PROFILE", "unlimited");
        env::set_var("QUOTA_MAX_FILE_SIZE_MB", "100");
        env::set_var("QUOTA_MAX_MESSAGE_LENGTH", "not-a-number");
        env::set_var("QUOTA_UPGRADE_ACTION", "https://example.com/upgrade");

        let config = QuotaConfig::from_env();

        assert_eq!(config.max_file_size_mb, 100);
        // Invalid override keeps the profile value
        assert_eq!(config.max_message_length, 0);
        assert_eq!(config.max_servers_owned, 0);
        assert_eq!(
            config.upgrade_action.as_deref(),
            Some("https://example.com/upgrade")
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        assert_eq!(QuotaConfig::from_env(), QuotaConfig::default());
    }
}
