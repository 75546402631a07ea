//! Pending action scheduler
//!
//! A background task that periodically reverses expired temporary mutes and
//! bans. Pending actions live only in guild state, so nothing is lost when the
//! task or the process restarts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, error, info, warn};

use super::{
    CaseDraft, CaseKind, CaseLedger, EchoKind, GuildGateway, GuildStateStore, ModerationError,
    ModerationResult, PendingAction, PendingActionKind, ReentrancyGuard, ReversalContext,
    ReversalOutcome, ReversalRegistry,
};

/// Requests understood by the scheduler task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerRequest {
    /// Run a cycle now instead of waiting for the next tick
    CheckNow,
    /// Stop the task after the current cycle
    Shutdown,
}

/// Counts from one scheduler cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub guilds: usize,
    pub reversed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Actions discarded because their guild is gone
    pub dropped: usize,
}

/// Reverses due timed actions on an interval
#[derive(Clone)]
pub struct PendingActionScheduler {
    store: GuildStateStore,
    gateway: Arc<dyn GuildGateway>,
    guard: ReentrancyGuard,
    ledger: CaseLedger,
    registry: Arc<ReversalRegistry>,
    interval: Duration,
    gateway_timeout: Duration,
    default_muted_role: Option<u64>,
}

impl PendingActionScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: GuildStateStore,
        gateway: Arc<dyn GuildGateway>,
        guard: ReentrancyGuard,
        ledger: CaseLedger,
        interval: Duration,
        gateway_timeout: Duration,
        default_muted_role: Option<u64>,
    ) -> Self {
        Self {
            store,
            gateway,
            guard,
            ledger,
            registry: Arc::new(ReversalRegistry::new()),
            interval,
            gateway_timeout,
            default_muted_role,
        }
    }

    /// Spawn the scheduler task
    #[must_use]
    pub fn start(self) -> SchedulerHandle {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move { self.run(rx).await });
        SchedulerHandle { tx, task }
    }

    async fn run(self, mut rx: Receiver<SchedulerRequest>) {
        info!(
            "Starting pending action scheduler with {}s interval",
            self.interval.as_secs()
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                request = rx.recv() => match request {
                    Some(SchedulerRequest::CheckNow) => {
                        debug!("Received request to check pending actions");
                        self.run_cycle(Utc::now()).await;
                    }
                    Some(SchedulerRequest::Shutdown) | None => {
                        info!("Received shutdown request for pending action scheduler");
                        break;
                    }
                },

                _ = interval.tick() => {
                    self.run_cycle(Utc::now()).await;
                }
            }
        }

        info!("Pending action scheduler shut down");
    }

    /// Reverse every action due at `now` across all guilds
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();

        for guild_id in self.store.guilds_with_due_actions(now) {
            if let Err(e) = self.process_guild(guild_id, now, &mut report).await {
                error!(guild_id, "Failed to process pending actions: {e}");
            }
        }

        if report.guilds > 0 {
            info!(
                guilds = report.guilds,
                reversed = report.reversed,
                skipped = report.skipped,
                failed = report.failed,
                dropped = report.dropped,
                "Pending action cycle finished"
            );
        }
        report
    }

    async fn process_guild(
        &self,
        guild_id: u64,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> ModerationResult<()> {
        // A command may have taken the guild since it was listed
        let Some(mut txn) = self.store.try_transaction(guild_id) else {
            debug!(guild_id, "Guild busy, deferring its pending actions");
            return Ok(());
        };
        let _token = self.guard.enter(guild_id);
        report.guilds += 1;

        if !txn.has_due_actions(now) {
            return Ok(());
        }

        // An unreachable gateway keeps the actions for the next cycle
        let exists = timeout(self.gateway_timeout, self.gateway.guild_exists(guild_id))
            .await
            .map_err(|_| ModerationError::Timeout(format!("guild lookup for {guild_id}")))??;

        let due = txn.take_due_actions(now);
        if !exists {
            info!(guild_id, count = due.len(), "Dropping pending actions of a departed guild");
            report.dropped += due.len();
            txn.commit().await?;
            return Ok(());
        }

        let bot_name = self.gateway.bot_name();
        for action in due {
            let ctx = ReversalContext {
                guild_id,
                muted_role_id: txn.muted_role(self.default_muted_role),
            };

            let unban = action.action == PendingActionKind::Unban;
            if unban {
                self.guard.expect_echo(guild_id, action.target_user_id, EchoKind::Unban);
            }
            let outcome = self.reverse(ctx, &action).await;
            if unban && !matches!(outcome, Ok(ReversalOutcome::Reversed { .. })) {
                self.guard.cancel_echo(guild_id, action.target_user_id, EchoKind::Unban);
            }

            match outcome {
                Ok(ReversalOutcome::Reversed { username }) => {
                    if action.action == PendingActionKind::Unmute {
                        txn.on_unmute(action.target_user_id);
                    }
                    let kind = match action.action {
                        PendingActionKind::Unban => CaseKind::Unban,
                        PendingActionKind::Unmute => CaseKind::Unmute,
                    };
                    let draft = CaseDraft::new(kind, action.target_user_id)
                        .username_opt(username)
                        .reason(format!("Time expired (case #{})", action.origin_case_number))
                        .moderator(&bot_name);
                    self.ledger.open_case(&mut txn, draft).await;
                    report.reversed += 1;
                }
                Ok(ReversalOutcome::Skipped(why)) => {
                    // The mute is over either way; a later rejoin must not re-mute
                    if action.action == PendingActionKind::Unmute {
                        txn.on_unmute(action.target_user_id);
                    }
                    debug!(
                        guild_id,
                        user_id = action.target_user_id,
                        "Skipped {} reversal: {why}",
                        action.action
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(
                        guild_id,
                        user_id = action.target_user_id,
                        case_number = action.origin_case_number,
                        "Failed to {} expired action: {e}",
                        action.action
                    );
                    report.failed += 1;
                }
            }
        }

        txn.commit().await?;
        Ok(())
    }

    async fn reverse(
        &self,
        ctx: ReversalContext,
        action: &PendingAction,
    ) -> ModerationResult<ReversalOutcome> {
        match timeout(
            self.gateway_timeout,
            self.registry.reverse(self.gateway.as_ref(), ctx, action),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(guild_id = ctx.guild_id, "Reversal timed out");
                Err(ModerationError::Timeout(format!(
                    "{} of {}",
                    action.action, action.target_user_id
                )))
            }
        }
    }
}

/// Control handle for a running scheduler task
#[derive(Debug)]
pub struct SchedulerHandle {
    tx: Sender<SchedulerRequest>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask for an immediate cycle
    ///
    /// # Errors
    /// Returns an error if the task has already stopped
    pub async fn check_now(&self) -> ModerationResult<()> {
        self.tx
            .send(SchedulerRequest::CheckNow)
            .await
            .map_err(|e| ModerationError::Other(format!("Failed to send check request: {e}")))
    }

    /// Stop the task and wait for an in-flight cycle to finish
    pub async fn shutdown(self) {
        if let Err(e) = self.tx.send(SchedulerRequest::Shutdown).await {
            warn!("Scheduler already stopped: {e}");
        }
        if let Err(e) = self.task.await {
            error!("Scheduler task ended abnormally: {e}");
        }
    }
}
