//! Per-guild moderation state
//!
//! One [`GuildModerationState`] document exists per guild. It is created with
//! defaults on first access and replaced wholesale on every committed change.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::case::Case;

/// Standing auto-enforcement policy for new joins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum RaidMode {
    #[default]
    #[display("off")]
    Off,
    #[display("kick")]
    Kick,
    #[display("ban")]
    Ban,
    #[display("lockdown")]
    Lockdown,
}

impl RaidMode {
    #[must_use]
    pub fn is_active(self) -> bool {
        self != Self::Off
    }
}

/// Reversal scheduled for a temporary action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum PendingActionKind {
    #[display("unmute")]
    Unmute,
    #[display("unban")]
    Unban,
}

/// A scheduled future reversal tied to a tempmute/tempban case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub target_user_id: u64,
    pub action: PendingActionKind,
    pub origin_case_number: u64,
    pub due_at: DateTime<Utc>,
}

impl PendingAction {
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

/// All moderation state of one guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildModerationState {
    pub guild_id: u64,
    pub raid_mode: RaidMode,
    /// Number the next case will get
    pub case_counter: u64,
    pub cases: Vec<Case>,
    pub forcebanned_users: BTreeSet<u64>,
    pub muted_users: BTreeSet<u64>,
    /// Channels whose `@everyone` send permission the current lockdown denied
    pub locked_channel_ids: BTreeSet<u64>,
    pub pending_actions: Vec<PendingAction>,
    /// User id -> case numbers of the warnings against that user
    pub warnings: BTreeMap<u64, Vec<u64>>,
    /// Overrides the bot-wide muted role
    pub muted_role_id: Option<u64>,
}

impl Default for GuildModerationState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GuildModerationState {
    /// The default document for a guild that has never been touched
    #[must_use]
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            raid_mode: RaidMode::Off,
            case_counter: 1,
            cases: Vec::new(),
            forcebanned_users: BTreeSet::new(),
            muted_users: BTreeSet::new(),
            locked_channel_ids: BTreeSet::new(),
            pending_actions: Vec::new(),
            warnings: BTreeMap::new(),
            muted_role_id: None,
        }
    }

    #[must_use]
    pub fn find_case(&self, number: u64) -> Option<&Case> {
        self.cases.iter().find(|case| case.number == number)
    }

    pub fn find_case_mut(&mut self, number: u64) -> Option<&mut Case> {
        self.cases.iter_mut().find(|case| case.number == number)
    }

    pub fn on_mute(&mut self, user_id: u64) {
        self.muted_users.insert(user_id);
    }

    pub fn on_unmute(&mut self, user_id: u64) {
        self.muted_users.remove(&user_id);
    }

    #[must_use]
    pub fn is_muted(&self, user_id: u64) -> bool {
        self.muted_users.contains(&user_id)
    }

    /// Guild muted role, falling back to the bot-wide default
    #[must_use]
    pub fn muted_role(&self, default: Option<u64>) -> Option<u64> {
        self.muted_role_id.or(default)
    }

    #[must_use]
    pub fn has_due_actions(&self, now: DateTime<Utc>) -> bool {
        self.pending_actions.iter().any(|action| action.is_due(now))
    }

    /// Remove and return every action due at `now`, keeping the rest in order
    pub fn take_due_actions(&mut self, now: DateTime<Utc>) -> Vec<PendingAction> {
        let (due, waiting) = std::mem::take(&mut self.pending_actions)
            .into_iter()
            .partition(|action| action.is_due(now));
        self.pending_actions = waiting;
        due
    }

    /// Case numbers of the warnings recorded against a user
    #[must_use]
    pub fn warnings_for(&self, user_id: u64) -> &[u64] {
        self.warnings.get(&user_id).map_or(&[], Vec::as_slice)
    }
}
