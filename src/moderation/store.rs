//! Guild state repository
//!
//! Every guild document lives in memory behind its own async mutex and is
//! written through to a [`StateBackend`]. All mutations go through a
//! [`GuildTransaction`]: the guild is locked, a draft copy is edited, and
//! `commit` persists the draft before it replaces the locked state. Two
//! operations on the same guild therefore never interleave, which is what keeps
//! case numbers dense and unique.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::{GuildModerationState, ModerationError, ModerationResult};

/// Durable storage for guild documents
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Load every stored guild document
    async fn load_all(&self) -> ModerationResult<Vec<GuildModerationState>>;

    /// Insert or replace one guild document
    async fn save(&self, state: &GuildModerationState) -> ModerationResult<()>;
}

/// One YAML file per guild under a data directory
#[derive(Debug, Clone)]
pub struct YamlBackend {
    dir: PathBuf,
}

impl YamlBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, guild_id: u64) -> PathBuf {
        self.dir.join(format!("{guild_id}.yaml"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl StateBackend for YamlBackend {
    async fn load_all(&self) -> ModerationResult<Vec<GuildModerationState>> {
        let pattern = self.dir.join("*.yaml");
        let pattern = pattern.to_string_lossy();
        let paths = glob::glob(&pattern)
            .map_err(|e| ModerationError::Persistence(format!("bad data directory: {e}")))?;

        let mut states = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable guild file: {e}");
                    continue;
                }
            };

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), "Failed to read guild file: {e}");
                    continue;
                }
            };

            match serde_yaml::from_str::<GuildModerationState>(&content) {
                Ok(state) => states.push(state),
                Err(e) => warn!(path = %path.display(), "Failed to parse guild file: {e}"),
            }
        }

        Ok(states)
    }

    async fn save(&self, state: &GuildModerationState) -> ModerationResult<()> {
        let yaml = serde_yaml::to_string(state)
            .map_err(|e| ModerationError::Persistence(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ModerationError::Persistence(e.to_string()))?;

        // Write next to the target and rename so a crash never leaves half a file
        let path = self.path_for(state.guild_id);
        let tmp = path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, yaml)
            .await
            .map_err(|e| ModerationError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| ModerationError::Persistence(e.to_string()))?;

        debug!(guild_id = state.guild_id, path = %path.display(), "Guild state saved");
        Ok(())
    }
}

/// Serialized, write-through access to guild documents
#[derive(Clone)]
pub struct GuildStateStore {
    guilds: Arc<DashMap<u64, Arc<Mutex<GuildModerationState>>>>,
    backend: Arc<dyn StateBackend>,
}

impl GuildStateStore {
    /// Create a store and load every document the backend holds
    ///
    /// # Errors
    /// Returns an error if the backend cannot enumerate its documents
    pub async fn open(backend: Arc<dyn StateBackend>) -> ModerationResult<Self> {
        let store = Self {
            guilds: Arc::new(DashMap::new()),
            backend,
        };

        let states = store.backend.load_all().await?;
        let count = states.len();
        for state in states {
            store
                .guilds
                .insert(state.guild_id, Arc::new(Mutex::new(state)));
        }

        info!("Loaded moderation state for {count} guild(s)");
        Ok(store)
    }

    fn slot(&self, guild_id: u64) -> Arc<Mutex<GuildModerationState>> {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(GuildModerationState::new(guild_id))))
            .clone()
    }

    /// Snapshot of a guild's state, default if it was never touched
    pub async fn get(&self, guild_id: u64) -> GuildModerationState {
        self.slot(guild_id).lock().await.clone()
    }

    /// Lock a guild for a read-modify-write cycle
    ///
    /// Other transactions on the same guild wait until this one is committed
    /// or dropped. Dropping without commit discards the draft.
    pub async fn transaction(&self, guild_id: u64) -> GuildTransaction {
        let guard = self.slot(guild_id).lock_owned().await;
        let draft = guard.clone();
        GuildTransaction {
            guard,
            draft,
            backend: Arc::clone(&self.backend),
        }
    }

    /// Lock a guild only if nobody else holds it
    pub fn try_transaction(&self, guild_id: u64) -> Option<GuildTransaction> {
        let guard = self.slot(guild_id).try_lock_owned().ok()?;
        let draft = guard.clone();
        Some(GuildTransaction {
            guard,
            draft,
            backend: Arc::clone(&self.backend),
        })
    }

    /// Guilds holding at least one pending action due at `now`
    ///
    /// Guilds locked by a running transaction are left out; their actions
    /// stay pending until a later call finds them free.
    pub fn guilds_with_due_actions(&self, now: DateTime<Utc>) -> Vec<u64> {
        let slots: Vec<(u64, Arc<Mutex<GuildModerationState>>)> = self
            .guilds
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut due = Vec::new();
        for (guild_id, slot) in slots {
            match slot.try_lock() {
                Ok(state) if state.has_due_actions(now) => due.push(guild_id),
                Ok(_) => {}
                Err(_) => debug!(guild_id, "Guild busy, checking its pending actions next cycle"),
            }
        }
        due.sort_unstable();
        due
    }

    #[must_use]
    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }
}

impl std::fmt::Debug for GuildStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildStateStore")
            .field("guilds", &self.guilds.len())
            .finish_non_exhaustive()
    }
}

/// A locked guild with a draft copy of its state
pub struct GuildTransaction {
    guard: OwnedMutexGuard<GuildModerationState>,
    draft: GuildModerationState,
    backend: Arc<dyn StateBackend>,
}

impl GuildTransaction {
    /// Persist the draft, then make it the guild's current state
    ///
    /// # Errors
    /// Returns `Persistence` if the backend rejects the write; the in-memory
    /// state is left as it was before the transaction
    pub async fn commit(self) -> ModerationResult<GuildModerationState> {
        let Self {
            mut guard,
            draft,
            backend,
        } = self;

        backend.save(&draft).await.map_err(|e| match e {
            ModerationError::Persistence(_) => e,
            other => ModerationError::Persistence(other.to_string()),
        })?;

        *guard = draft.clone();
        Ok(draft)
    }
}

impl Deref for GuildTransaction {
    type Target = GuildModerationState;

    fn deref(&self) -> &Self::Target {
        &self.draft
    }
}

impl DerefMut for GuildTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.draft
    }
}
