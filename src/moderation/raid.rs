//! Raid mode
//!
//! Raid mode is a binary toggle. Turning it on picks a method: `kick` and `ban`
//! act on every new join, `lockdown` denies `@everyone` the right to send
//! messages in every text channel until raid mode is turned off again.

use std::str::FromStr;
use std::sync::Arc;

use derive_more::Display;
use tracing::{info, warn};

use super::{
    Case, CaseDraft, CaseKind, CaseLedger, EchoKind, GuildGateway, GuildModerationState,
    MemberInfo, ModerationError, RaidMode, ReentrancyGuard,
};

pub const RAID_KICK_REASON: &str = "raid-mode auto-kick";
pub const RAID_BAN_REASON: &str = "raid-mode auto-ban";
pub const FORCEBAN_REASON: &str = "previously forcebanned";
pub const MUTE_EVASION_REASON: &str = "mute evasion attempt";
pub const RAID_METHOD_HELP: &str = "Raidmode method must be kick, ban, or lockdown.";

/// Method requested when turning raid mode on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum RaidMethod {
    #[default]
    #[display("kick")]
    Kick,
    #[display("ban")]
    Ban,
    #[display("lockdown")]
    Lockdown,
}

impl From<RaidMethod> for RaidMode {
    fn from(method: RaidMethod) -> Self {
        match method {
            RaidMethod::Kick => Self::Kick,
            RaidMethod::Ban => Self::Ban,
            RaidMethod::Lockdown => Self::Lockdown,
        }
    }
}

impl FromStr for RaidMethod {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kick" => Ok(Self::Kick),
            "ban" => Ok(Self::Ban),
            "lockdown" => Ok(Self::Lockdown),
            _ => Err(ModerationError::Other(RAID_METHOD_HELP.to_string())),
        }
    }
}

/// Result of a raid mode toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaidToggle {
    /// `locked_channels` is only set when the method was lockdown
    Enabled {
        method: RaidMethod,
        locked_channels: Option<usize>,
    },
    /// `unlocked_channels` is only set when a lockdown was lifted
    Disabled { unlocked_channels: Option<usize> },
}

impl RaidToggle {
    /// Reply shown to the moderator
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Enabled {
                method,
                locked_channels,
            } => {
                let mut out = String::new();
                if let Some(count) = locked_channels {
                    out.push_str(&format!("Locked down {count} channels.\n"));
                }
                out.push_str(&format!("Raid mode enabled. Method: {method}"));
                out
            }
            Self::Disabled { unlocked_channels } => {
                let mut out = String::new();
                if let Some(count) = unlocked_channels {
                    out.push_str(&format!("Unlocked {count} channels.\n"));
                }
                out.push_str("Raid mode disabled.");
                out
            }
        }
    }
}

/// Applies raid mode, lockdowns and join-time enforcement
#[derive(Clone)]
pub struct RaidModeController {
    gateway: Arc<dyn GuildGateway>,
    guard: ReentrancyGuard,
    ledger: CaseLedger,
    default_muted_role: Option<u64>,
}

impl RaidModeController {
    pub fn new(
        gateway: Arc<dyn GuildGateway>,
        guard: ReentrancyGuard,
        ledger: CaseLedger,
        default_muted_role: Option<u64>,
    ) -> Self {
        Self {
            gateway,
            guard,
            ledger,
            default_muted_role,
        }
    }

    /// Flip raid mode on `state`
    ///
    /// When raid mode is already on, the requested method is ignored and raid
    /// mode is turned off, lifting a lockdown if one is in place.
    pub async fn toggle(&self, state: &mut GuildModerationState, method: RaidMethod) -> RaidToggle {
        if state.raid_mode.is_active() {
            let unlocked_channels = if state.raid_mode == RaidMode::Lockdown {
                Some(self.lockdown_exit(state).await)
            } else {
                None
            };
            state.raid_mode = RaidMode::Off;
            info!(guild_id = state.guild_id, "Raid mode disabled");
            RaidToggle::Disabled { unlocked_channels }
        } else {
            let locked_channels = if method == RaidMethod::Lockdown {
                Some(self.lockdown_enter(state).await)
            } else {
                None
            };
            state.raid_mode = method.into();
            info!(guild_id = state.guild_id, %method, "Raid mode enabled");
            RaidToggle::Enabled {
                method,
                locked_channels,
            }
        }
    }

    /// Deny `@everyone` send-messages on every text channel not already denied
    ///
    /// Returns the number of channels locked. Channels the bot fails to update
    /// are logged and left out of the lock set.
    pub async fn lockdown_enter(&self, state: &mut GuildModerationState) -> usize {
        let guild_id = state.guild_id;
        state.locked_channel_ids.clear();

        let channels = match self.gateway.text_channels(guild_id).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(guild_id, "Failed to list channels for lockdown: {e}");
                return 0;
            }
        };

        for channel in channels {
            if channel.everyone_send_messages == Some(false) {
                continue;
            }
            match self
                .gateway
                .set_everyone_send_messages(guild_id, channel.channel_id, Some(false))
                .await
            {
                Ok(()) => {
                    state.locked_channel_ids.insert(channel.channel_id);
                }
                Err(e) => warn!(
                    guild_id,
                    channel_id = channel.channel_id,
                    "Failed to lock channel: {e}"
                ),
            }
        }

        state.locked_channel_ids.len()
    }

    /// Reset the send-messages override on every locked channel
    ///
    /// Returns the number of channels that were locked. The lock set is
    /// cleared even if some resets fail.
    pub async fn lockdown_exit(&self, state: &mut GuildModerationState) -> usize {
        let guild_id = state.guild_id;
        let locked = std::mem::take(&mut state.locked_channel_ids);

        for channel_id in &locked {
            if let Err(e) = self
                .gateway
                .set_everyone_send_messages(guild_id, *channel_id, None)
                .await
            {
                warn!(guild_id, channel_id, "Failed to unlock channel: {e}");
            }
        }

        locked.len()
    }

    /// Apply raid mode, forceban and mute re-application to a new member
    ///
    /// Every action runs with the guild marked as acting on itself. Failures
    /// are logged and produce no case.
    pub async fn enforce_on_join(
        &self,
        state: &mut GuildModerationState,
        member: &MemberInfo,
    ) -> Vec<Case> {
        let guild_id = state.guild_id;
        let user_id = member.user_id;
        let moderator = self.gateway.bot_name();
        let _token = self.guard.enter(guild_id);
        let mut cases = Vec::new();

        let raid_action = match state.raid_mode {
            RaidMode::Kick => Some((CaseKind::Kick, RAID_KICK_REASON)),
            RaidMode::Ban => Some((CaseKind::Ban, RAID_BAN_REASON)),
            RaidMode::Off | RaidMode::Lockdown => None,
        };
        if let Some((kind, reason)) = raid_action {
            let result = if kind == CaseKind::Kick {
                self.gateway.kick(guild_id, user_id, reason).await
            } else {
                self.guard
                    .expecting_echo(
                        guild_id,
                        user_id,
                        EchoKind::Ban,
                        self.gateway.ban(guild_id, user_id, reason),
                    )
                    .await
            };
            match result {
                Ok(()) => {
                    let draft = CaseDraft::new(kind, user_id)
                        .username(&member.username)
                        .reason(reason)
                        .moderator(&moderator);
                    cases.push(self.ledger.open_case(state, draft).await);
                }
                Err(e) => warn!(guild_id, user_id, "Raid mode {kind} failed: {e}"),
            }
        }

        if state.forcebanned_users.contains(&user_id) {
            let banned = self
                .guard
                .expecting_echo(
                    guild_id,
                    user_id,
                    EchoKind::Ban,
                    self.gateway.ban(guild_id, user_id, FORCEBAN_REASON),
                )
                .await;
            match banned {
                Ok(()) => {
                    let draft = CaseDraft::new(CaseKind::Ban, user_id)
                        .username(&member.username)
                        .reason(FORCEBAN_REASON)
                        .moderator(&moderator);
                    cases.push(self.ledger.open_case(state, draft).await);
                }
                Err(e) => warn!(guild_id, user_id, "Forceban on join failed: {e}"),
            }
        }

        if state.is_muted(user_id) {
            match state.muted_role(self.default_muted_role) {
                Some(role_id) => match self.gateway.add_role(guild_id, user_id, role_id).await {
                    Ok(()) => {
                        let draft = CaseDraft::new(CaseKind::Mute, user_id)
                            .username(&member.username)
                            .reason(MUTE_EVASION_REASON)
                            .moderator(&moderator);
                        cases.push(self.ledger.open_case(state, draft).await);
                    }
                    Err(e) => warn!(guild_id, user_id, "Re-applying mute failed: {e}"),
                },
                None => warn!(guild_id, user_id, "Muted member rejoined but no muted role is set"),
            }
        }

        cases
    }
}
