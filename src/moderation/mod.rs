//! Moderation engine
//!
//! A numbered case ledger per guild, timed punishments reversed by a background
//! scheduler, raid mode, and a reentrancy guard that keeps the bot's own
//! actions from being logged twice.

mod case;
mod duration;
mod error;
pub mod gateway;
mod guard;
mod ledger;
mod raid;
mod reversal;
mod scheduler;
mod service;
mod state;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use case::{Case, CaseDraft, CaseKind, DEFAULT_REASON};
pub use duration::{ParsedDuration, parse_duration};
pub use error::{ModerationError, ModerationResult};
pub use gateway::{
    ChannelOverride, GuildGateway, LogEmbed, MemberInfo, RoleOverride, SerenityGateway,
    TextChannelInfo, TimeoutGateway,
};
pub use guard::{ECHO_WINDOW, EchoKind, ReentrancyGuard, SelfActionToken};
pub use ledger::CaseLedger;
pub use raid::{RAID_METHOD_HELP, RaidMethod, RaidModeController, RaidToggle};
pub use reversal::{ReversalContext, ReversalHandler, ReversalOutcome, ReversalRegistry};
pub use scheduler::{CycleReport, PendingActionScheduler, SchedulerHandle, SchedulerRequest};
pub use service::{
    ForcebanOutcome, LoggedMessage, ModerationService, MuteOutcome, ServiceSettings, TargetUser,
    WarnOutcome, WarningEntry, render_warnings,
};
pub use state::{GuildModerationState, PendingAction, PendingActionKind, RaidMode};
pub use store::{GuildStateStore, GuildTransaction, StateBackend, YamlBackend};
