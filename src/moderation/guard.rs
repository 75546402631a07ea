//! Self-action reentrancy guard
//!
//! Kicks, bans, unbans and role changes made by the bot come back from Discord
//! as membership events. While a guild has at least one self-caused operation
//! in flight, those events must not open audit cases of their own.
//!
//! Ban and unban events can also arrive after the operation has returned, so
//! each such call leaves an expected-echo marker for its (guild, user) pair
//! that the matching event consumes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use derive_more::Display;
use tokio::time::Instant;

use super::ModerationResult;

/// How long an expected echo waits for its event before it is forgotten
pub const ECHO_WINDOW: Duration = Duration::from_secs(60);

/// Membership events the bot's own calls produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EchoKind {
    #[display("ban")]
    Ban,
    #[display("unban")]
    Unban,
}

type EchoKey = (u64, u64, EchoKind);

/// Per-guild count of in-flight self-caused operations
#[derive(Clone, Default)]
pub struct ReentrancyGuard {
    counters: Arc<DashMap<u64, usize>>,
    /// Deadlines of echoes not yet delivered, oldest first
    echoes: Arc<DashMap<EchoKey, Vec<Instant>>>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the guild as acting on itself until the returned token is dropped
    #[must_use = "the guild is only marked while the token is alive"]
    pub fn enter(&self, guild_id: u64) -> SelfActionToken {
        *self.counters.entry(guild_id).or_insert(0) += 1;
        SelfActionToken {
            guard: self.clone(),
            guild_id,
        }
    }

    /// Whether membership events for this guild should be ignored right now
    #[must_use]
    pub fn is_suppressed(&self, guild_id: u64) -> bool {
        self.depth(guild_id) > 0
    }

    /// Number of self-caused operations currently in flight for the guild
    #[must_use]
    pub fn depth(&self, guild_id: u64) -> usize {
        self.counters.get(&guild_id).map_or(0, |count| *count)
    }

    /// Record that `kind` for this user is about to be caused by the bot
    pub fn expect_echo(&self, guild_id: u64, user_id: u64, kind: EchoKind) {
        self.echoes
            .entry((guild_id, user_id, kind))
            .or_default()
            .push(Instant::now() + ECHO_WINDOW);
    }

    /// Withdraw the newest marker after the call that set it failed
    pub fn cancel_echo(&self, guild_id: u64, user_id: u64, kind: EchoKind) {
        if let Entry::Occupied(mut entry) = self.echoes.entry((guild_id, user_id, kind)) {
            entry.get_mut().pop();
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    /// Run a gateway call that will echo back as `kind`
    ///
    /// The marker is set before the call so an event racing the response is
    /// still matched, and withdrawn if the call fails.
    pub async fn expecting_echo<T>(
        &self,
        guild_id: u64,
        user_id: u64,
        kind: EchoKind,
        call: impl Future<Output = ModerationResult<T>>,
    ) -> ModerationResult<T> {
        self.expect_echo(guild_id, user_id, kind);
        let result = call.await;
        if result.is_err() {
            self.cancel_echo(guild_id, user_id, kind);
        }
        result
    }

    /// Match an incoming event against an expected echo, consuming it
    ///
    /// Returns false when the event was not caused by the bot.
    pub fn consume_echo(&self, guild_id: u64, user_id: u64, kind: EchoKind) -> bool {
        let Entry::Occupied(mut entry) = self.echoes.entry((guild_id, user_id, kind)) else {
            return false;
        };

        let now = Instant::now();
        entry.get_mut().retain(|deadline| *deadline > now);
        let matched = !entry.get().is_empty();
        if matched {
            entry.get_mut().remove(0);
        }
        if entry.get().is_empty() {
            entry.remove();
        }
        matched
    }

    fn leave(&self, guild_id: u64) {
        if let Entry::Occupied(mut entry) = self.counters.entry(guild_id) {
            if *entry.get() <= 1 {
                entry.remove();
            } else {
                *entry.get_mut() -= 1;
            }
        }
    }
}

impl std::fmt::Debug for ReentrancyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReentrancyGuard")
            .field("guilds", &self.counters.len())
            .field("pending_echoes", &self.echoes.len())
            .finish()
    }
}

/// RAII marker returned by [`ReentrancyGuard::enter`]
pub struct SelfActionToken {
    guard: ReentrancyGuard,
    guild_id: u64,
}

impl Drop for SelfActionToken {
    fn drop(&mut self) {
        self.guard.leave(self.guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entry() {
        let guard = ReentrancyGuard::new();
        assert!(!guard.is_suppressed(1));

        let token = guard.enter(1);
        assert!(guard.is_suppressed(1));
        assert!(!guard.is_suppressed(2));

        drop(token);
        assert!(!guard.is_suppressed(1));
    }

    #[test]
    fn test_overlapping_entries_on_same_guild() {
        let guard = ReentrancyGuard::new();

        let first = guard.enter(42);
        let second = guard.enter(42);
        assert_eq!(guard.depth(42), 2);

        // The first operation finishing must not unmark the second one
        drop(first);
        assert!(guard.is_suppressed(42));

        drop(second);
        assert!(!guard.is_suppressed(42));
        assert_eq!(guard.depth(42), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_is_consumed_once() {
        let guard = ReentrancyGuard::new();
        guard.expect_echo(1, 10, EchoKind::Ban);

        assert!(!guard.consume_echo(1, 10, EchoKind::Unban));
        assert!(!guard.consume_echo(1, 11, EchoKind::Ban));
        assert!(guard.consume_echo(1, 10, EchoKind::Ban));
        assert!(!guard.consume_echo(1, 10, EchoKind::Ban));
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_expires() {
        let guard = ReentrancyGuard::new();
        guard.expect_echo(1, 10, EchoKind::Ban);

        tokio::time::advance(ECHO_WINDOW + Duration::from_secs(1)).await;
        assert!(!guard.consume_echo(1, 10, EchoKind::Ban));
    }

    #[tokio::test]
    async fn test_failed_call_withdraws_echo() {
        let guard = ReentrancyGuard::new();

        let failed: ModerationResult<()> = guard
            .expecting_echo(1, 10, EchoKind::Ban, async {
                Err(crate::moderation::ModerationError::PermissionDenied(
                    "ban_members".to_string(),
                ))
            })
            .await;
        assert!(failed.is_err());
        assert!(!guard.consume_echo(1, 10, EchoKind::Ban));

        guard
            .expecting_echo(1, 10, EchoKind::Unban, async { Ok(()) })
            .await
            .unwrap();
        assert!(guard.consume_echo(1, 10, EchoKind::Unban));
    }

    #[tokio::test]
    async fn test_concurrent_tasks_balance_out() {
        let guard = ReentrancyGuard::new();
        let mut tasks = Vec::new();

        for _ in 0..32 {
            let guard = guard.clone();
            tasks.push(tokio::spawn(async move {
                let _token = guard.enter(7);
                tokio::task::yield_now().await;
                assert!(guard.is_suppressed(7));
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert!(!guard.is_suppressed(7));
    }
}
