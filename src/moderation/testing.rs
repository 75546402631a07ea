//! In-memory doubles for the state backend and the guild gateway

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    ChannelOverride, GuildGateway, GuildModerationState, LogEmbed, MemberInfo, ModerationError,
    ModerationResult, RoleOverride, StateBackend, TextChannelInfo,
};

/// Raw channel type of guild text channels
pub const TEXT_KIND: u8 = 0;
/// Raw channel type of guild voice channels
pub const VOICE_KIND: u8 = 2;

pub const BOT_NAME: &str = "casekeeper#0001";

/// Backend that keeps documents in a map and can be told to fail
#[derive(Default)]
pub struct MemoryBackend {
    docs: DashMap<u64, GuildModerationState>,
    fail: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states(states: Vec<GuildModerationState>) -> Self {
        let backend = Self::new();
        for state in states {
            backend.docs.insert(state.guild_id, state);
        }
        backend
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self, guild_id: u64) -> Option<GuildModerationState> {
        self.docs.get(&guild_id).map(|doc| doc.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn load_all(&self) -> ModerationResult<Vec<GuildModerationState>> {
        Ok(self.docs.iter().map(|doc| doc.clone()).collect())
    }

    async fn save(&self, state: &GuildModerationState) -> ModerationResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ModerationError::Persistence("backend offline".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.docs.insert(state.guild_id, state.clone());
        Ok(())
    }
}

/// Recorded side effect of a [`FakeGateway`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Kick(u64, u64),
    Ban(u64, u64),
    Unban(u64, u64),
    AddRole(u64, u64, u64),
    RemoveRole(u64, u64, u64),
    SetSendMessages(u64, Option<bool>),
    Slowmode(u64, u16),
    Purge(u64, u8),
    PurgeBot(u64, u8),
    SetRoleOverride(u64, u64),
}

#[derive(Default)]
struct FakeGuilds {
    guilds: HashSet<u64>,
    members: HashMap<(u64, u64), MemberInfo>,
    bans: BTreeSet<(u64, u64)>,
    channels: BTreeMap<u64, Vec<TextChannelInfo>>,
    kinds: HashMap<u64, u8>,
    overrides: HashMap<(u64, u64), RoleOverride>,
    /// Per channel, oldest first; `true` marks a bot author
    history: HashMap<u64, Vec<bool>>,
    denied: HashSet<&'static str>,
    stalled: HashSet<&'static str>,
    calls: Vec<Call>,
    sent: Vec<(u64, u64, String)>,
    edits: Vec<(u64, u64, String)>,
    embeds: Vec<(u64, LogEmbed)>,
    next_message_id: u64,
}

/// Small simulated Discord: guilds, members, bans, channels and messages
#[derive(Default)]
pub struct FakeGateway {
    inner: Mutex<FakeGuilds>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.inner.lock().unwrap().next_message_id = 1000;
        gateway
    }

    pub fn add_guild(&self, guild_id: u64) {
        self.inner.lock().unwrap().guilds.insert(guild_id);
    }

    pub fn remove_guild(&self, guild_id: u64) {
        self.inner.lock().unwrap().guilds.remove(&guild_id);
    }

    pub fn add_member(&self, guild_id: u64, user_id: u64, username: &str) {
        self.inner.lock().unwrap().members.insert(
            (guild_id, user_id),
            MemberInfo {
                user_id,
                username: username.to_string(),
                role_ids: Vec::new(),
            },
        );
    }

    pub fn add_text_channel(&self, guild_id: u64, channel_id: u64, name: &str, send: Option<bool>) {
        self.inner
            .lock()
            .unwrap()
            .channels
            .entry(guild_id)
            .or_default()
            .push(TextChannelInfo {
                channel_id,
                name: name.to_string(),
                everyone_send_messages: send,
            });
    }

    pub fn add_voice_channel(&self, guild_id: u64, channel_id: u64, name: &str) {
        self.add_text_channel(guild_id, channel_id, name, None);
        self.inner.lock().unwrap().kinds.insert(channel_id, VOICE_KIND);
    }

    pub fn set_override(&self, channel_id: u64, role_id: u64, value: RoleOverride) {
        self.inner
            .lock()
            .unwrap()
            .overrides
            .insert((channel_id, role_id), value);
    }

    pub fn role_override(&self, channel_id: u64, role_id: u64) -> RoleOverride {
        self.inner
            .lock()
            .unwrap()
            .overrides
            .get(&(channel_id, role_id))
            .copied()
            .unwrap_or_default()
    }

    /// Append messages to a channel's history, `true` for bot authors
    pub fn post_history(&self, channel_id: u64, authors: &[bool]) {
        self.inner
            .lock()
            .unwrap()
            .history
            .entry(channel_id)
            .or_default()
            .extend_from_slice(authors);
    }

    pub fn history(&self, channel_id: u64) -> Vec<bool> {
        self.inner
            .lock()
            .unwrap()
            .history
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the named operation hang until the caller gives up
    pub fn stall(&self, operation: &'static str) {
        self.inner.lock().unwrap().stalled.insert(operation);
    }

    async fn hold_if_stalled(&self, operation: &str) {
        let stalled = self.inner.lock().unwrap().stalled.contains(operation);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn is_text(inner: &FakeGuilds, channel_id: u64) -> bool {
        inner.kinds.get(&channel_id).copied().unwrap_or(TEXT_KIND) == TEXT_KIND
    }

    /// Make every call needing `permission` fail with `PermissionDenied`
    pub fn deny(&self, permission: &'static str) {
        self.inner.lock().unwrap().denied.insert(permission);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn is_banned(&self, guild_id: u64, user_id: u64) -> bool {
        self.inner.lock().unwrap().bans.contains(&(guild_id, user_id))
    }

    pub fn member(&self, guild_id: u64, user_id: u64) -> Option<MemberInfo> {
        self.inner
            .lock()
            .unwrap()
            .members
            .get(&(guild_id, user_id))
            .cloned()
    }

    pub fn channel_state(&self, guild_id: u64, channel_id: u64) -> Option<bool> {
        self.inner
            .lock()
            .unwrap()
            .channels
            .get(&guild_id)
            .and_then(|channels| channels.iter().find(|c| c.channel_id == channel_id))
            .and_then(|channel| channel.everyone_send_messages)
    }

    /// Messages posted so far as `(channel, message id, content)`
    pub fn sent(&self) -> Vec<(u64, u64, String)> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn edits(&self) -> Vec<(u64, u64, String)> {
        self.inner.lock().unwrap().edits.clone()
    }

    pub fn embeds(&self) -> Vec<(u64, LogEmbed)> {
        self.inner.lock().unwrap().embeds.clone()
    }

    fn check(&self, permission: &'static str) -> ModerationResult<()> {
        if self.inner.lock().unwrap().denied.contains(permission) {
            Err(ModerationError::PermissionDenied(permission.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GuildGateway for FakeGateway {
    async fn guild_exists(&self, guild_id: u64) -> ModerationResult<bool> {
        self.hold_if_stalled("guild_exists").await;
        Ok(self.inner.lock().unwrap().guilds.contains(&guild_id))
    }

    fn bot_name(&self) -> String {
        BOT_NAME.to_string()
    }

    async fn get_member(&self, guild_id: u64, user_id: u64) -> ModerationResult<Option<MemberInfo>> {
        self.hold_if_stalled("get_member").await;
        Ok(self.member(guild_id, user_id))
    }

    async fn username(&self, user_id: u64) -> ModerationResult<String> {
        Ok(format!("user{user_id}"))
    }

    async fn kick(&self, guild_id: u64, user_id: u64, _reason: &str) -> ModerationResult<()> {
        self.hold_if_stalled("kick").await;
        self.check("kick_members")?;
        let mut inner = self.inner.lock().unwrap();
        inner.members.remove(&(guild_id, user_id));
        inner.calls.push(Call::Kick(guild_id, user_id));
        Ok(())
    }

    async fn ban(&self, guild_id: u64, user_id: u64, _reason: &str) -> ModerationResult<()> {
        self.hold_if_stalled("ban").await;
        self.check("ban_members")?;
        let mut inner = self.inner.lock().unwrap();
        inner.members.remove(&(guild_id, user_id));
        inner.bans.insert((guild_id, user_id));
        inner.calls.push(Call::Ban(guild_id, user_id));
        Ok(())
    }

    async fn unban(&self, guild_id: u64, user_id: u64) -> ModerationResult<()> {
        self.hold_if_stalled("unban").await;
        self.check("ban_members")?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.bans.remove(&(guild_id, user_id)) {
            return Err(ModerationError::Other(format!("{user_id} is not banned")));
        }
        inner.calls.push(Call::Unban(guild_id, user_id));
        Ok(())
    }

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()> {
        self.check("manage_roles")?;
        let mut inner = self.inner.lock().unwrap();
        let member = inner
            .members
            .get_mut(&(guild_id, user_id))
            .ok_or_else(|| ModerationError::GuildOrMemberNotFound(user_id.to_string()))?;
        if !member.role_ids.contains(&role_id) {
            member.role_ids.push(role_id);
        }
        inner.calls.push(Call::AddRole(guild_id, user_id, role_id));
        Ok(())
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()> {
        self.check("manage_roles")?;
        let mut inner = self.inner.lock().unwrap();
        let member = inner
            .members
            .get_mut(&(guild_id, user_id))
            .ok_or_else(|| ModerationError::GuildOrMemberNotFound(user_id.to_string()))?;
        member.role_ids.retain(|role| *role != role_id);
        inner.calls.push(Call::RemoveRole(guild_id, user_id, role_id));
        Ok(())
    }

    async fn text_channels(&self, guild_id: u64) -> ModerationResult<Vec<TextChannelInfo>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .channels
            .get(&guild_id)
            .map(|channels| {
                channels
                    .iter()
                    .filter(|c| Self::is_text(&inner, c.channel_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_everyone_send_messages(
        &self,
        guild_id: u64,
        channel_id: u64,
        value: Option<bool>,
    ) -> ModerationResult<()> {
        self.check("manage_roles")?;
        let mut inner = self.inner.lock().unwrap();
        let channel = inner
            .channels
            .get_mut(&guild_id)
            .and_then(|channels| channels.iter_mut().find(|c| c.channel_id == channel_id))
            .ok_or_else(|| ModerationError::Other(format!("no channel {channel_id}")))?;
        channel.everyone_send_messages = value;
        inner.calls.push(Call::SetSendMessages(channel_id, value));
        Ok(())
    }

    async fn find_text_channel(&self, guild_id: u64, name: &str) -> ModerationResult<Option<u64>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .channels
            .get(&guild_id)
            .and_then(|channels| {
                channels
                    .iter()
                    .find(|c| c.name == name && Self::is_text(&inner, c.channel_id))
            })
            .map(|channel| channel.channel_id))
    }

    async fn send_message(&self, channel_id: u64, content: &str) -> ModerationResult<u64> {
        self.check("send_messages")?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_message_id += 1;
        let id = inner.next_message_id;
        inner.sent.push((channel_id, id, content.to_string()));
        Ok(id)
    }

    async fn send_embed(&self, channel_id: u64, embed: &LogEmbed) -> ModerationResult<()> {
        self.check("embed_links")?;
        self.inner
            .lock()
            .unwrap()
            .embeds
            .push((channel_id, embed.clone()));
        Ok(())
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> ModerationResult<()> {
        self.check("send_messages")?;
        self.inner
            .lock()
            .unwrap()
            .edits
            .push((channel_id, message_id, content.to_string()));
        Ok(())
    }

    async fn set_slowmode(&self, channel_id: u64, seconds: u16) -> ModerationResult<()> {
        self.check("manage_channels")?;
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(Call::Slowmode(channel_id, seconds));
        Ok(())
    }

    async fn purge(&self, channel_id: u64, count: u8) -> ModerationResult<usize> {
        self.check("manage_messages")?;
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(Call::Purge(channel_id, count));
        Ok(usize::from(count))
    }

    async fn purge_bot_messages(&self, channel_id: u64, limit: u8) -> ModerationResult<usize> {
        self.check("manage_messages")?;
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::PurgeBot(channel_id, limit));
        let history = inner.history.entry(channel_id).or_default();
        let start = history.len().saturating_sub(usize::from(limit));
        let before = history.len();
        let mut index = 0;
        history.retain(|bot| {
            let keep = index < start || !*bot;
            index += 1;
            keep
        });
        Ok(before - history.len())
    }

    async fn role_overrides(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> ModerationResult<Vec<ChannelOverride>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .channels
            .get(&guild_id)
            .map(|channels| {
                channels
                    .iter()
                    .map(|c| ChannelOverride {
                        channel_id: c.channel_id,
                        name: c.name.clone(),
                        kind: inner.kinds.get(&c.channel_id).copied().unwrap_or(TEXT_KIND),
                        role_override: inner
                            .overrides
                            .get(&(c.channel_id, role_id))
                            .copied()
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_role_override(
        &self,
        channel_id: u64,
        role_id: u64,
        value: RoleOverride,
    ) -> ModerationResult<()> {
        self.check("manage_roles")?;
        let mut inner = self.inner.lock().unwrap();
        if value.is_empty() {
            inner.overrides.remove(&(channel_id, role_id));
        } else {
            inner.overrides.insert((channel_id, role_id), value);
        }
        inner.calls.push(Call::SetRoleOverride(channel_id, role_id));
        Ok(())
    }
}
