//! Reversal handlers for expired temporary actions
//!
//! Each [`PendingActionKind`] has one handler that undoes the original action
//! through the gateway. The scheduler looks handlers up in a
//! [`ReversalRegistry`].

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use super::{GuildGateway, ModerationError, ModerationResult, PendingAction, PendingActionKind};

/// Guild-level facts a reversal may need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversalContext {
    pub guild_id: u64,
    pub muted_role_id: Option<u64>,
}

/// What happened when a reversal ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReversalOutcome {
    /// The action was undone; carries the target's display name if known
    Reversed { username: Option<String> },
    /// Nothing to undo
    Skipped(&'static str),
}

/// Trait for undoing one kind of timed action
#[async_trait]
pub trait ReversalHandler: Send + Sync {
    async fn reverse(
        &self,
        gateway: &dyn GuildGateway,
        ctx: ReversalContext,
        action: &PendingAction,
    ) -> ModerationResult<ReversalOutcome>;
}

/// Registry of reversal handlers
pub struct ReversalRegistry {
    handlers: HashMap<PendingActionKind, Box<dyn ReversalHandler>>,
}

impl Default for ReversalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReversalRegistry {
    /// Create a registry with the unban and unmute handlers registered
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register(PendingActionKind::Unban, Box::new(UnbanHandler));
        registry.register(PendingActionKind::Unmute, Box::new(UnmuteHandler));
        registry
    }

    pub fn register(&mut self, kind: PendingActionKind, handler: Box<dyn ReversalHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Run the handler registered for the action's kind
    ///
    /// # Errors
    /// Returns an error if no handler is registered or the handler fails
    pub async fn reverse(
        &self,
        gateway: &dyn GuildGateway,
        ctx: ReversalContext,
        action: &PendingAction,
    ) -> ModerationResult<ReversalOutcome> {
        let handler = self.handlers.get(&action.action).ok_or_else(|| {
            ModerationError::Other(format!("No handler registered for {}", action.action))
        })?;
        handler.reverse(gateway, ctx, action).await
    }
}

/// Lifts a temporary ban
struct UnbanHandler;

#[async_trait]
impl ReversalHandler for UnbanHandler {
    async fn reverse(
        &self,
        gateway: &dyn GuildGateway,
        ctx: ReversalContext,
        action: &PendingAction,
    ) -> ModerationResult<ReversalOutcome> {
        let user_id = action.target_user_id;
        gateway.unban(ctx.guild_id, user_id).await?;
        info!(guild_id = ctx.guild_id, user_id, "Lifted expired ban");

        let username = gateway.username(user_id).await.ok();
        Ok(ReversalOutcome::Reversed { username })
    }
}

/// Removes the muted role after a temporary mute
struct UnmuteHandler;

#[async_trait]
impl ReversalHandler for UnmuteHandler {
    async fn reverse(
        &self,
        gateway: &dyn GuildGateway,
        ctx: ReversalContext,
        action: &PendingAction,
    ) -> ModerationResult<ReversalOutcome> {
        let user_id = action.target_user_id;
        let role_id = ctx
            .muted_role_id
            .ok_or(ModerationError::MutedRoleNotConfigured)?;

        let Some(member) = gateway.get_member(ctx.guild_id, user_id).await? else {
            return Ok(ReversalOutcome::Skipped("member left the guild"));
        };
        if !member.has_role(role_id) {
            return Ok(ReversalOutcome::Skipped("member is no longer muted"));
        }

        gateway.remove_role(ctx.guild_id, user_id, role_id).await?;
        info!(guild_id = ctx.guild_id, user_id, "Lifted expired mute");
        Ok(ReversalOutcome::Reversed {
            username: Some(member.username),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::MemberInfo;
    use crate::moderation::gateway::MockGuildGateway;
    use chrono::Utc;

    fn pending(kind: PendingActionKind) -> PendingAction {
        PendingAction {
            target_user_id: 10,
            action: kind,
            origin_case_number: 4,
            due_at: Utc::now(),
        }
    }

    const CTX: ReversalContext = ReversalContext {
        guild_id: 1,
        muted_role_id: Some(99),
    };

    #[tokio::test]
    async fn test_unban_reversal() {
        let mut gateway = MockGuildGateway::new();
        gateway
            .expect_unban()
            .withf(|guild, user| *guild == 1 && *user == 10)
            .times(1)
            .returning(|_, _| Ok(()));
        gateway
            .expect_username()
            .returning(|_| Ok("user10".to_string()));

        let outcome = ReversalRegistry::new()
            .reverse(&gateway, CTX, &pending(PendingActionKind::Unban))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReversalOutcome::Reversed {
                username: Some("user10".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_unban_permission_denied_propagates() {
        let mut gateway = MockGuildGateway::new();
        gateway
            .expect_unban()
            .returning(|_, _| Err(ModerationError::PermissionDenied("ban_members".into())));

        let result = ReversalRegistry::new()
            .reverse(&gateway, CTX, &pending(PendingActionKind::Unban))
            .await;
        assert!(matches!(result, Err(ModerationError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_unmute_skips_absent_member() {
        let mut gateway = MockGuildGateway::new();
        gateway.expect_get_member().returning(|_, _| Ok(None));
        gateway.expect_remove_role().never();

        let outcome = ReversalRegistry::new()
            .reverse(&gateway, CTX, &pending(PendingActionKind::Unmute))
            .await
            .unwrap();
        assert!(matches!(outcome, ReversalOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn test_unmute_removes_role() {
        let mut gateway = MockGuildGateway::new();
        gateway.expect_get_member().returning(|_, user_id| {
            Ok(Some(MemberInfo {
                user_id,
                username: "muted#0001".to_string(),
                role_ids: vec![99],
            }))
        });
        gateway
            .expect_remove_role()
            .withf(|guild, user, role| (*guild, *user, *role) == (1, 10, 99))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let outcome = ReversalRegistry::new()
            .reverse(&gateway, CTX, &pending(PendingActionKind::Unmute))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReversalOutcome::Reversed {
                username: Some("muted#0001".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_unmute_without_role_configured() {
        let gateway = MockGuildGateway::new();
        let ctx = ReversalContext {
            guild_id: 1,
            muted_role_id: None,
        };
        let result = ReversalRegistry::new()
            .reverse(&gateway, ctx, &pending(PendingActionKind::Unmute))
            .await;
        assert!(matches!(result, Err(ModerationError::MutedRoleNotConfigured)));
    }
}
