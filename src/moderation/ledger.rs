//! Case ledger
//!
//! Cases are numbered per guild from the guild's `case_counter`. Numbers are
//! assigned while the guild transaction is held, so they stay dense and unique
//! no matter how many commands race on the same guild.

use std::sync::Arc;

use tracing::{info, warn};

use super::{
    Case, CaseDraft, GuildGateway, GuildModerationState, GuildStateStore, ModerationError,
    ModerationResult,
};

/// Opens, renders and amends cases
#[derive(Clone)]
pub struct CaseLedger {
    gateway: Arc<dyn GuildGateway>,
    store: GuildStateStore,
    audit_channel: String,
}

impl CaseLedger {
    pub fn new(
        gateway: Arc<dyn GuildGateway>,
        store: GuildStateStore,
        audit_channel: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            audit_channel: audit_channel.into(),
        }
    }

    /// Append a new case to `state`, posting it to the audit channel
    ///
    /// Nothing is persisted here; the caller commits the transaction that owns
    /// `state`, which keeps the counter bump and the case append together. A
    /// failed audit post is logged and leaves the case without a message id.
    pub async fn open_case(&self, state: &mut GuildModerationState, draft: CaseDraft) -> Case {
        let number = state.case_counter;
        state.case_counter += 1;

        let mut case = draft.into_case(number);
        case.audit_message_id = self.post(state.guild_id, &case).await;

        info!(
            guild_id = state.guild_id,
            case_number = number,
            kind = %case.kind,
            user_id = case.target_user_id,
            "Opened case"
        );

        state.cases.push(case.clone());
        case
    }

    /// Open a case in its own transaction and commit it
    ///
    /// # Errors
    /// Returns `Persistence` if the guild state cannot be saved
    pub async fn record(&self, guild_id: u64, draft: CaseDraft) -> ModerationResult<Case> {
        let mut txn = self.store.transaction(guild_id).await;
        let case = self.open_case(&mut txn, draft).await;
        txn.commit().await?;
        Ok(case)
    }

    /// Replace the reason and responsible moderator of an existing case
    ///
    /// The audit message, if there is one, is edited in place. Amending the
    /// same case again overwrites the previous amendment.
    ///
    /// # Errors
    /// Returns `CaseNotFound` if the guild has no case with that number, or
    /// `Persistence` if the change cannot be saved
    pub async fn amend_reason(
        &self,
        guild_id: u64,
        number: u64,
        reason: &str,
        moderator: &str,
    ) -> ModerationResult<Case> {
        let mut txn = self.store.transaction(guild_id).await;
        let case = txn
            .find_case_mut(number)
            .ok_or(ModerationError::CaseNotFound(number))?;
        case.reason = reason.to_string();
        case.moderator = Some(moderator.to_string());
        let case = case.clone();

        if let Some(message_id) = case.audit_message_id {
            self.edit_post(guild_id, message_id, &case).await;
        }

        txn.commit().await?;
        info!(guild_id, case_number = number, moderator, "Amended case reason");
        Ok(case)
    }

    async fn audit_channel_id(&self, guild_id: u64) -> Option<u64> {
        match self
            .gateway
            .find_text_channel(guild_id, &self.audit_channel)
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                warn!(guild_id, "Failed to look up audit channel: {e}");
                None
            }
        }
    }

    async fn post(&self, guild_id: u64, case: &Case) -> Option<u64> {
        let channel_id = self.audit_channel_id(guild_id).await?;
        match self.gateway.send_message(channel_id, &case.render()).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                warn!(guild_id, case_number = case.number, "Failed to post case: {e}");
                None
            }
        }
    }

    async fn edit_post(&self, guild_id: u64, message_id: u64, case: &Case) {
        let Some(channel_id) = self.audit_channel_id(guild_id).await else {
            return;
        };
        if let Err(e) = self
            .gateway
            .edit_message(channel_id, message_id, &case.render())
            .await
        {
            warn!(guild_id, case_number = case.number, "Failed to edit case message: {e}");
        }
    }
}

impl std::fmt::Debug for CaseLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseLedger")
            .field("audit_channel", &self.audit_channel)
            .finish_non_exhaustive()
    }
}
