use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::moderation::ServiceSettings;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_AUDIT_CHANNEL: &str = "mod-log";
pub const DEFAULT_MESSAGE_LOG_CHANNEL: &str = "message-log";
pub const DEFAULT_COMMAND_PREFIX: &str = ".";
pub const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Process-wide settings read from the environment
#[derive(Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub data_dir: PathBuf,
    /// Muted role for guilds that have not picked one with `mutedrole`
    pub muted_role_id: Option<u64>,
    pub audit_channel: String,
    pub message_log_channel: String,
    pub command_prefix: String,
    pub scheduler_interval: Duration,
    pub gateway_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|s| !s.is_empty())
            .ok_or("DISCORD_TOKEN environment variable not set")?;

        let data_dir = lookup("DATA_DIR")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
            .into();

        let muted_role_id = match lookup("MUTED_ROLE_ID").filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| format!("MUTED_ROLE_ID is not a role id: {raw}"))?,
            ),
            None => None,
        };

        let audit_channel = lookup("AUDIT_CHANNEL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_AUDIT_CHANNEL.to_string());

        let message_log_channel = lookup("MESSAGE_LOG_CHANNEL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE_LOG_CHANNEL.to_string());

        let command_prefix = lookup("COMMAND_PREFIX")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        let scheduler_interval = lookup("SCHEDULER_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SCHEDULER_INTERVAL_SECS);

        let gateway_timeout = lookup("GATEWAY_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_SECS);

        Ok(Self {
            discord_token,
            data_dir,
            muted_role_id,
            audit_channel,
            message_log_channel,
            command_prefix,
            scheduler_interval: Duration::from_secs(scheduler_interval),
            gateway_timeout: Duration::from_secs(gateway_timeout),
        })
    }

    /// Directory holding one YAML file per guild
    #[must_use]
    pub fn guilds_dir(&self) -> PathBuf {
        self.data_dir.join("guilds")
    }

    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            default_muted_role: self.muted_role_id,
            audit_channel: self.audit_channel.clone(),
            message_log_channel: self.message_log_channel.clone(),
        }
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("data_dir", &self.data_dir)
            .field("muted_role_id", &self.muted_role_id)
            .field("audit_channel", &self.audit_channel)
            .field("message_log_channel", &self.message_log_channel)
            .field("command_prefix", &self.command_prefix)
            .field("scheduler_interval", &self.scheduler_interval)
            .field("gateway_timeout", &self.gateway_timeout)
            .finish()
    }
}
