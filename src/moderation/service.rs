//! Moderation service
//!
//! One operation per moderator command plus one handler per platform event.
//! Every operation that changes guild state runs inside a guild transaction,
//! and every operation that causes a membership event holds a reentrancy token
//! until its case is committed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{
    Case, CaseDraft, CaseKind, CaseLedger, EchoKind, GuildGateway, GuildStateStore, LogEmbed,
    MemberInfo, ModerationError, ModerationResult, PendingAction, PendingActionKind,
    PendingActionScheduler, RaidMethod, RaidModeController, RaidToggle, ReentrancyGuard,
    parse_duration,
};

pub const DELETE_LOG_COLOUR: u32 = 0xff_615b;
pub const EDIT_LOG_COLOUR: u32 = 0x5b_92ff;
const EDIT_PREVIEW_CHARS: usize = 1000;

/// Bot-wide settings the service needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Muted role used by guilds that have not set their own
    pub default_muted_role: Option<u64>,
    pub audit_channel: String,
    pub message_log_channel: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_muted_role: None,
            audit_channel: "mod-log".to_string(),
            message_log_channel: "message-log".to_string(),
        }
    }
}

/// The user a command acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUser {
    pub user_id: u64,
    pub username: String,
}

impl TargetUser {
    pub fn new(user_id: u64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// A previous warning, with its reason if the case still exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningEntry {
    pub case_number: u64,
    pub reason: Option<String>,
}

impl std::fmt::Display for WarningEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "Case {} - {reason}", self.case_number),
            None => write!(f, "Case {} (not found)", self.case_number),
        }
    }
}

/// List a user's warnings, one per line under a count header
#[must_use]
pub fn render_warnings(mention: &str, warnings: &[WarningEntry], exclaim: bool) -> String {
    let mut out = format!(
        "{mention} has {} previous warning(s){}\n",
        warnings.len(),
        if exclaim { "!" } else { "." }
    );
    for warning in warnings {
        out.push_str(&warning.to_string());
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarnOutcome {
    pub case: Case,
    /// Warnings that existed before this one
    pub prior: Vec<WarningEntry>,
}

impl WarnOutcome {
    /// Reply shown to the moderator
    #[must_use]
    pub fn message(&self, mention: &str) -> String {
        let mut out =
            "Warning logged. Further infractions may lead to a temporary to permanent ban.\n"
                .to_string();
        if !self.prior.is_empty() {
            out.push_str(&render_warnings(mention, &self.prior, true));
        }
        out
    }
}

/// Which way a mute toggle went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuteOutcome {
    Muted(Case),
    Unmuted(Case),
}

impl MuteOutcome {
    #[must_use]
    pub fn case(&self) -> &Case {
        match self {
            Self::Muted(case) | Self::Unmuted(case) => case,
        }
    }
}

/// How a forceban was carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForcebanOutcome {
    /// The user was a member and got a normal ban
    Banned(Case),
    /// The user was not a member; they will be banned on join
    Recorded(Case),
}

/// A message as seen by the message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    pub author: String,
    pub channel_name: String,
    pub content: String,
    pub attachment_urls: Vec<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Command and event operations of the moderation engine
#[derive(Clone)]
pub struct ModerationService {
    store: GuildStateStore,
    gateway: Arc<dyn GuildGateway>,
    guard: ReentrancyGuard,
    ledger: CaseLedger,
    raid: RaidModeController,
    settings: Arc<ServiceSettings>,
}

impl ModerationService {
    pub fn new(
        store: GuildStateStore,
        gateway: Arc<dyn GuildGateway>,
        settings: ServiceSettings,
    ) -> Self {
        let guard = ReentrancyGuard::new();
        let ledger = CaseLedger::new(
            Arc::clone(&gateway),
            store.clone(),
            settings.audit_channel.clone(),
        );
        let raid = RaidModeController::new(
            Arc::clone(&gateway),
            guard.clone(),
            ledger.clone(),
            settings.default_muted_role,
        );

        Self {
            store,
            gateway,
            guard,
            ledger,
            raid,
            settings: Arc::new(settings),
        }
    }

    #[must_use]
    pub fn store(&self) -> &GuildStateStore {
        &self.store
    }

    #[must_use]
    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    /// A scheduler sharing this service's store, gateway, guard and ledger
    #[must_use]
    pub fn scheduler(&self, interval: Duration, gateway_timeout: Duration) -> PendingActionScheduler {
        PendingActionScheduler::new(
            self.store.clone(),
            Arc::clone(&self.gateway),
            self.guard.clone(),
            self.ledger.clone(),
            interval,
            gateway_timeout,
            self.settings.default_muted_role,
        )
    }

    async fn muted_role(&self, guild_id: u64) -> ModerationResult<u64> {
        self.store
            .get(guild_id)
            .await
            .muted_role(self.settings.default_muted_role)
            .ok_or(ModerationError::MutedRoleNotConfigured)
    }

    async fn require_member(&self, guild_id: u64, user_id: u64) -> ModerationResult<MemberInfo> {
        self.gateway
            .get_member(guild_id, user_id)
            .await?
            .ok_or_else(|| {
                ModerationError::GuildOrMemberNotFound(format!(
                    "member {user_id} in guild {guild_id}"
                ))
            })
    }

    fn draft(kind: CaseKind, target: &TargetUser, reason: Option<&str>, moderator: &str) -> CaseDraft {
        let draft = CaseDraft::new(kind, target.user_id)
            .username(&target.username)
            .moderator(moderator);
        match reason {
            Some(reason) => draft.reason(reason),
            None => draft,
        }
    }

    /// Log a warning and return the target's earlier warnings
    ///
    /// # Errors
    /// Returns `Persistence` if the warning cannot be saved
    pub async fn warn(
        &self,
        guild_id: u64,
        target: &TargetUser,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<WarnOutcome> {
        let mut txn = self.store.transaction(guild_id).await;

        let prior = Self::warning_entries(&txn, target.user_id);
        let draft = Self::draft(CaseKind::Warn, target, reason, moderator);
        let case = self.ledger.open_case(&mut txn, draft).await;
        txn.warnings
            .entry(target.user_id)
            .or_default()
            .push(case.number);

        txn.commit().await?;
        Ok(WarnOutcome { case, prior })
    }

    /// Warnings recorded against a user
    pub async fn warn_list(&self, guild_id: u64, user_id: u64) -> Vec<WarningEntry> {
        let state = self.store.get(guild_id).await;
        Self::warning_entries(&state, user_id)
    }

    fn warning_entries(state: &super::GuildModerationState, user_id: u64) -> Vec<WarningEntry> {
        state
            .warnings_for(user_id)
            .iter()
            .map(|&case_number| WarningEntry {
                case_number,
                reason: state.find_case(case_number).map(|case| case.reason.clone()),
            })
            .collect()
    }

    /// Mute the target, or unmute them if they already carry the muted role
    ///
    /// # Errors
    /// Returns `MutedRoleNotConfigured`, `GuildOrMemberNotFound`,
    /// `PermissionDenied` or `Persistence`; nothing is recorded on error
    pub async fn mute(
        &self,
        guild_id: u64,
        target: &TargetUser,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<MuteOutcome> {
        let role_id = self.muted_role(guild_id).await?;
        let member = self.require_member(guild_id, target.user_id).await?;

        let _token = self.guard.enter(guild_id);
        let mut txn = self.store.transaction(guild_id).await;

        let outcome = if member.has_role(role_id) {
            self.gateway
                .remove_role(guild_id, target.user_id, role_id)
                .await?;
            txn.on_unmute(target.user_id);
            let draft = Self::draft(CaseKind::Unmute, target, reason, moderator);
            MuteOutcome::Unmuted(self.ledger.open_case(&mut txn, draft).await)
        } else {
            self.gateway
                .add_role(guild_id, target.user_id, role_id)
                .await?;
            txn.on_mute(target.user_id);
            let draft = Self::draft(CaseKind::Mute, target, reason, moderator);
            MuteOutcome::Muted(self.ledger.open_case(&mut txn, draft).await)
        };

        txn.commit().await?;
        Ok(outcome)
    }

    /// Mute the target and schedule the unmute
    ///
    /// # Errors
    /// Returns `InvalidDuration` before anything happens if the duration does
    /// not parse, `AlreadyMuted` if the target carries the muted role, or any
    /// error [`Self::mute`] can return
    pub async fn tempmute(
        &self,
        guild_id: u64,
        target: &TargetUser,
        duration: &str,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<Case> {
        let duration = parse_duration(duration)?;
        let due_at = duration.expiry_from(Utc::now())?;
        let role_id = self.muted_role(guild_id).await?;
        let member = self.require_member(guild_id, target.user_id).await?;
        if member.has_role(role_id) {
            return Err(ModerationError::AlreadyMuted(target.user_id));
        }

        let _token = self.guard.enter(guild_id);
        let mut txn = self.store.transaction(guild_id).await;

        self.gateway
            .add_role(guild_id, target.user_id, role_id)
            .await?;
        txn.on_mute(target.user_id);

        let reason = format!("{} [{duration}]", reason.unwrap_or(super::DEFAULT_REASON));
        let draft = Self::draft(CaseKind::Tempmute, target, Some(reason.as_str()), moderator);
        let case = self.ledger.open_case(&mut txn, draft).await;
        txn.pending_actions.push(PendingAction {
            target_user_id: target.user_id,
            action: PendingActionKind::Unmute,
            origin_case_number: case.number,
            due_at,
        });

        txn.commit().await?;
        info!(guild_id, user_id = target.user_id, %due_at, "Scheduled unmute");
        Ok(case)
    }

    /// # Errors
    /// Returns `PermissionDenied` or `Persistence`; no case on gateway failure
    pub async fn kick(
        &self,
        guild_id: u64,
        target: &TargetUser,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<Case> {
        let _token = self.guard.enter(guild_id);
        let mut txn = self.store.transaction(guild_id).await;

        let draft = Self::draft(CaseKind::Kick, target, reason, moderator);
        self.gateway
            .kick(guild_id, target.user_id, &draft.reason)
            .await?;
        let case = self.ledger.open_case(&mut txn, draft).await;

        txn.commit().await?;
        Ok(case)
    }

    /// # Errors
    /// Returns `PermissionDenied` or `Persistence`; no case on gateway failure
    pub async fn ban(
        &self,
        guild_id: u64,
        target: &TargetUser,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<Case> {
        let _token = self.guard.enter(guild_id);
        let mut txn = self.store.transaction(guild_id).await;

        let draft = Self::draft(CaseKind::Ban, target, reason, moderator);
        self.guard
            .expecting_echo(
                guild_id,
                target.user_id,
                EchoKind::Ban,
                self.gateway.ban(guild_id, target.user_id, &draft.reason),
            )
            .await?;
        let case = self.ledger.open_case(&mut txn, draft).await;

        txn.commit().await?;
        Ok(case)
    }

    /// Ban the target and schedule the unban
    ///
    /// # Errors
    /// Returns `InvalidDuration` before anything happens if the duration does
    /// not parse, otherwise `PermissionDenied` or `Persistence`
    pub async fn tempban(
        &self,
        guild_id: u64,
        target: &TargetUser,
        duration: &str,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<Case> {
        let duration = parse_duration(duration)?;
        let due_at = duration.expiry_from(Utc::now())?;

        let _token = self.guard.enter(guild_id);
        let mut txn = self.store.transaction(guild_id).await;

        let reason = format!("{} [{duration}]", reason.unwrap_or(super::DEFAULT_REASON));
        let draft = Self::draft(CaseKind::Tempban, target, Some(reason.as_str()), moderator);
        self.guard
            .expecting_echo(
                guild_id,
                target.user_id,
                EchoKind::Ban,
                self.gateway.ban(guild_id, target.user_id, &draft.reason),
            )
            .await?;
        let case = self.ledger.open_case(&mut txn, draft).await;
        txn.pending_actions.push(PendingAction {
            target_user_id: target.user_id,
            action: PendingActionKind::Unban,
            origin_case_number: case.number,
            due_at,
        });

        txn.commit().await?;
        info!(guild_id, user_id = target.user_id, %due_at, "Scheduled unban");
        Ok(case)
    }

    /// Ban a member, or remember a non-member so they are banned on join
    ///
    /// # Errors
    /// Returns `PermissionDenied` or `Persistence`
    pub async fn forceban(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<ForcebanOutcome> {
        if let Some(member) = self.gateway.get_member(guild_id, user_id).await? {
            let target = TargetUser::new(user_id, member.username);
            return Ok(ForcebanOutcome::Banned(
                self.ban(guild_id, &target, reason, moderator).await?,
            ));
        }

        let username = match self.gateway.username(user_id).await {
            Ok(name) => name,
            Err(e) => {
                debug!(user_id, "Could not resolve forcebanned user: {e}");
                user_id.to_string()
            }
        };
        let target = TargetUser::new(user_id, username);

        let mut txn = self.store.transaction(guild_id).await;
        txn.forcebanned_users.insert(user_id);
        let draft = Self::draft(CaseKind::Forceban, &target, reason, moderator);
        let case = self.ledger.open_case(&mut txn, draft).await;

        txn.commit().await?;
        Ok(ForcebanOutcome::Recorded(case))
    }

    /// Ban and immediately unban, clearing the target's recent messages
    ///
    /// # Errors
    /// Returns `PermissionDenied` or `Persistence`
    pub async fn softban(
        &self,
        guild_id: u64,
        target: &TargetUser,
        reason: Option<&str>,
        moderator: &str,
    ) -> ModerationResult<Case> {
        let _token = self.guard.enter(guild_id);
        let mut txn = self.store.transaction(guild_id).await;

        let draft = Self::draft(CaseKind::Softban, target, reason, moderator);
        self.guard
            .expecting_echo(
                guild_id,
                target.user_id,
                EchoKind::Ban,
                self.gateway.ban(guild_id, target.user_id, &draft.reason),
            )
            .await?;
        self.guard
            .expecting_echo(
                guild_id,
                target.user_id,
                EchoKind::Unban,
                self.gateway.unban(guild_id, target.user_id),
            )
            .await?;
        let case = self.ledger.open_case(&mut txn, draft).await;

        txn.commit().await?;
        Ok(case)
    }

    /// Set the reason of an existing case and take responsibility for it
    ///
    /// # Errors
    /// Returns `CaseNotFound` or `Persistence`
    pub async fn amend_reason(
        &self,
        guild_id: u64,
        number: u64,
        reason: &str,
        moderator: &str,
    ) -> ModerationResult<Case> {
        self.ledger
            .amend_reason(guild_id, number, reason, moderator)
            .await
    }

    /// # Errors
    /// Returns `Persistence` if the new mode cannot be saved
    pub async fn toggle_raid_mode(
        &self,
        guild_id: u64,
        method: RaidMethod,
    ) -> ModerationResult<RaidToggle> {
        let mut txn = self.store.transaction(guild_id).await;
        let toggle = self.raid.toggle(&mut txn, method).await;
        txn.commit().await?;
        Ok(toggle)
    }

    /// # Errors
    /// Returns `PermissionDenied` if the bot cannot edit the channel
    pub async fn slowmode(&self, channel_id: u64, seconds: u16) -> ModerationResult<()> {
        self.gateway.set_slowmode(channel_id, seconds).await?;
        info!(channel_id, seconds, "Set slowmode");
        Ok(())
    }

    /// # Errors
    /// Returns `PermissionDenied` if the bot cannot delete messages
    pub async fn purge(&self, channel_id: u64, count: u8) -> ModerationResult<usize> {
        let deleted = self.gateway.purge(channel_id, count).await?;
        info!(channel_id, deleted, "Purged messages");
        Ok(deleted)
    }

    /// # Errors
    /// Returns `PermissionDenied` if the bot cannot delete messages
    pub async fn purge_bot_messages(&self, channel_id: u64, limit: u8) -> ModerationResult<usize> {
        let deleted = self.gateway.purge_bot_messages(channel_id, limit).await?;
        info!(channel_id, limit, deleted, "Purged bot messages");
        Ok(deleted)
    }

    /// Copy `role_id`'s override on the source channel to every channel of
    /// the same type, returning the names of channels left alone because they
    /// already had an override of their own
    ///
    /// # Errors
    /// Returns `ChannelNotFound` if the source is not a channel of the guild,
    /// otherwise `PermissionDenied` from the first refused edit
    pub async fn copy_role_overrides(
        &self,
        guild_id: u64,
        role_id: u64,
        source_channel_id: u64,
        overwrite: bool,
    ) -> ModerationResult<Vec<String>> {
        let channels = self.gateway.role_overrides(guild_id, role_id).await?;
        let source = channels
            .iter()
            .find(|channel| channel.channel_id == source_channel_id)
            .ok_or(ModerationError::ChannelNotFound(source_channel_id))?;

        let mut skipped = Vec::new();
        let mut copied = 0usize;
        for channel in &channels {
            if channel.kind != source.kind || channel.channel_id == source.channel_id {
                continue;
            }
            if !channel.role_override.is_empty() && !overwrite {
                skipped.push(channel.name.clone());
                continue;
            }
            self.gateway
                .set_role_override(channel.channel_id, role_id, source.role_override)
                .await?;
            copied += 1;
        }

        info!(
            guild_id,
            role_id,
            source_channel_id,
            copied,
            skipped = skipped.len(),
            "Copied role overrides"
        );
        Ok(skipped)
    }

    /// # Errors
    /// Returns `Persistence` if the setting cannot be saved
    pub async fn set_muted_role(&self, guild_id: u64, role_id: u64) -> ModerationResult<()> {
        let mut txn = self.store.transaction(guild_id).await;
        txn.muted_role_id = Some(role_id);
        txn.commit().await?;
        Ok(())
    }

    /// Apply raid mode, forcebans and mute re-application to a new member
    ///
    /// # Errors
    /// Returns `Persistence` if the resulting cases cannot be saved
    pub async fn on_member_join(
        &self,
        guild_id: u64,
        member: &MemberInfo,
    ) -> ModerationResult<Vec<Case>> {
        let mut txn = self.store.transaction(guild_id).await;
        let cases = self.raid.enforce_on_join(&mut txn, member).await;
        if !cases.is_empty() {
            txn.commit().await?;
        }
        Ok(cases)
    }

    /// Record a ban the bot did not cause
    ///
    /// # Errors
    /// Returns `Persistence` if the case cannot be saved
    pub async fn on_member_ban(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
    ) -> ModerationResult<Option<Case>> {
        self.record_external(guild_id, CaseKind::Ban, user_id, username)
            .await
    }

    /// Record an unban the bot did not cause
    ///
    /// # Errors
    /// Returns `Persistence` if the case cannot be saved
    pub async fn on_member_unban(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
    ) -> ModerationResult<Option<Case>> {
        self.record_external(guild_id, CaseKind::Unban, user_id, username)
            .await
    }

    async fn record_external(
        &self,
        guild_id: u64,
        kind: CaseKind,
        user_id: u64,
        username: &str,
    ) -> ModerationResult<Option<Case>> {
        let echo = match kind {
            CaseKind::Unban => EchoKind::Unban,
            _ => EchoKind::Ban,
        };
        // Consume the marker first so a late echo cannot outlive its window
        let own = self.guard.consume_echo(guild_id, user_id, echo);
        if own || self.guard.is_suppressed(guild_id) {
            debug!(guild_id, user_id, %kind, "Ignoring self-caused membership event");
            return Ok(None);
        }

        let draft = CaseDraft::new(kind, user_id).username(username);
        self.ledger.record(guild_id, draft).await.map(Some)
    }

    /// Track the muted role being added or removed outside the bot
    ///
    /// `role_ids` is the member's full role list after the change.
    ///
    /// # Errors
    /// Returns `Persistence` if the case cannot be saved
    pub async fn on_member_roles_changed(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        role_ids: &[u64],
    ) -> ModerationResult<Option<Case>> {
        if self.guard.is_suppressed(guild_id) {
            return Ok(None);
        }

        let mut txn = self.store.transaction(guild_id).await;
        let Some(role_id) = txn.muted_role(self.settings.default_muted_role) else {
            return Ok(None);
        };

        let has_role = role_ids.contains(&role_id);
        let kind = match (txn.is_muted(user_id), has_role) {
            (false, true) => {
                txn.on_mute(user_id);
                CaseKind::Mute
            }
            (true, false) => {
                txn.on_unmute(user_id);
                CaseKind::Unmute
            }
            _ => return Ok(None),
        };

        let draft = CaseDraft::new(kind, user_id).username(username);
        let case = self.ledger.open_case(&mut txn, draft).await;
        txn.commit().await?;
        Ok(Some(case))
    }

    /// Post a deleted message to the message log
    ///
    /// Returns whether anything was posted.
    ///
    /// # Errors
    /// Returns an error if the log channel exists but cannot be posted to
    pub async fn on_message_delete(
        &self,
        guild_id: u64,
        message: &LoggedMessage,
    ) -> ModerationResult<bool> {
        let Some(channel_id) = self.message_log(guild_id).await? else {
            return Ok(false);
        };

        let embed = LogEmbed {
            title: format!(
                "{} deleted a message in {}.",
                message.author, message.channel_name
            ),
            description: non_empty(&message.content),
            fields: attachment_fields(message),
            colour: DELETE_LOG_COLOUR,
            footer: Some("Originally sent".to_string()),
            timestamp: message.sent_at,
        };
        self.gateway.send_embed(channel_id, &embed).await?;
        Ok(true)
    }

    /// Post the original and new content of an edited message
    ///
    /// Edits that leave the content unchanged are ignored.
    ///
    /// # Errors
    /// Returns an error if the log channel exists but cannot be posted to
    pub async fn on_message_edit(
        &self,
        guild_id: u64,
        before: &LoggedMessage,
        new_content: &str,
    ) -> ModerationResult<bool> {
        if before.content == new_content {
            return Ok(false);
        }
        let Some(channel_id) = self.message_log(guild_id).await? else {
            return Ok(false);
        };

        let mut fields = attachment_fields(before);
        fields.push(("New Content".to_string(), preview(new_content)));
        let embed = LogEmbed {
            title: format!(
                "{} edited a message in {} (below is original message).",
                before.author, before.channel_name
            ),
            description: non_empty(&before.content),
            fields,
            colour: EDIT_LOG_COLOUR,
            footer: None,
            timestamp: None,
        };
        self.gateway.send_embed(channel_id, &embed).await?;
        Ok(true)
    }

    async fn message_log(&self, guild_id: u64) -> ModerationResult<Option<u64>> {
        self.gateway
            .find_text_channel(guild_id, &self.settings.message_log_channel)
            .await
    }
}

impl std::fmt::Debug for ModerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationService")
            .field("store", &self.store)
            .field("guard", &self.guard)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn non_empty(content: &str) -> Option<String> {
    (!content.is_empty()).then(|| content.to_string())
}

fn attachment_fields(message: &LoggedMessage) -> Vec<(String, String)> {
    message
        .attachment_urls
        .iter()
        .map(|url| ("Attachment".to_string(), url.clone()))
        .collect()
}

/// Content cut to the first 1000 characters, marked with `...` when cut
fn preview(content: &str) -> String {
    if content.chars().count() < EDIT_PREVIEW_CHARS {
        content.to_string()
    } else {
        let mut cut: String = content.chars().take(EDIT_PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
