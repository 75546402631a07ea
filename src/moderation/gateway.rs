//! Guild action gateway
//!
//! Everything the engine does to a guild goes through [`GuildGateway`]. The
//! production implementation talks to Discord over serenity's HTTP client;
//! tests substitute a fake or a mock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use poise::serenity_prelude::{
    ChannelId, ChannelType, CreateEmbed, CreateEmbedFooter, CreateMessage, EditChannel,
    EditMessage, GetMessages, GuildChannel, GuildId, Http, Member, Message, MessageId,
    PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, Timestamp, UserId,
};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::error::http_status;
use super::{ModerationError, ModerationResult};

/// Days of message history removed together with a ban
const BAN_DELETE_MESSAGE_DAYS: u8 = 1;

/// Discord refuses to bulk delete messages older than this
const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// The parts of a guild member the engine looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: u64,
    /// `name` or `name#discriminator`, as shown in audit messages
    pub username: String,
    pub role_ids: Vec<u64>,
}

impl From<&Member> for MemberInfo {
    fn from(member: &Member) -> Self {
        Self {
            user_id: member.user.id.get(),
            username: member.user.tag(),
            role_ids: member.roles.iter().map(|role| role.get()).collect(),
        }
    }
}

impl MemberInfo {
    #[must_use]
    pub fn has_role(&self, role_id: u64) -> bool {
        self.role_ids.contains(&role_id)
    }
}

/// A text channel and the state of its `@everyone` send-messages override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChannelInfo {
    pub channel_id: u64,
    pub name: String,
    /// `Some(false)` explicitly denied, `Some(true)` explicitly allowed,
    /// `None` inherited
    pub everyone_send_messages: Option<bool>,
}

/// One role's permission override on a channel, as raw permission bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleOverride {
    pub allow: u64,
    pub deny: u64,
}

impl RoleOverride {
    /// No bit allowed or denied, the same as having no override
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allow == 0 && self.deny == 0
    }
}

/// A guild channel and the override one role has on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOverride {
    pub channel_id: u64,
    pub name: String,
    /// Raw channel type; overrides are only copied between equal kinds
    pub kind: u8,
    pub role_override: RoleOverride,
}

/// Embed posted to the message log channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEmbed {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<(String, String)>,
    pub colour: u32,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Platform mutations and lookups the engine needs
///
/// All ids are raw snowflakes. A refusal by the platform is reported as
/// [`ModerationError::PermissionDenied`] naming the missing permission.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuildGateway: Send + Sync {
    /// Whether the bot can still see the guild
    async fn guild_exists(&self, guild_id: u64) -> ModerationResult<bool>;

    /// The bot's own user name, used as moderator of engine-opened cases
    fn bot_name(&self) -> String;

    /// `None` if the user is not a member of the guild
    async fn get_member(&self, guild_id: u64, user_id: u64) -> ModerationResult<Option<MemberInfo>>;

    async fn username(&self, user_id: u64) -> ModerationResult<String>;

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> ModerationResult<()>;

    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> ModerationResult<()>;

    async fn unban(&self, guild_id: u64, user_id: u64) -> ModerationResult<()>;

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()>;

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()>;

    async fn text_channels(&self, guild_id: u64) -> ModerationResult<Vec<TextChannelInfo>>;

    /// Set the `@everyone` send-messages override; `None` resets it to inherit
    async fn set_everyone_send_messages(
        &self,
        guild_id: u64,
        channel_id: u64,
        value: Option<bool>,
    ) -> ModerationResult<()>;

    /// Id of the guild text channel called `name`, if any
    async fn find_text_channel(&self, guild_id: u64, name: &str) -> ModerationResult<Option<u64>>;

    /// Post a plain message and return its id
    async fn send_message(&self, channel_id: u64, content: &str) -> ModerationResult<u64>;

    async fn send_embed(&self, channel_id: u64, embed: &LogEmbed) -> ModerationResult<()>;

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> ModerationResult<()>;

    async fn set_slowmode(&self, channel_id: u64, seconds: u16) -> ModerationResult<()>;

    /// Delete the latest `count` messages and return how many went
    async fn purge(&self, channel_id: u64, count: u8) -> ModerationResult<usize>;

    /// Delete the bot-authored messages among the latest `limit`
    async fn purge_bot_messages(&self, channel_id: u64, limit: u8) -> ModerationResult<usize>;

    /// Every guild channel with `role_id`'s override on it, empty where unset
    async fn role_overrides(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> ModerationResult<Vec<ChannelOverride>>;

    /// Replace `role_id`'s override on a channel; an empty one removes it
    async fn set_role_override(
        &self,
        channel_id: u64,
        role_id: u64,
        value: RoleOverride,
    ) -> ModerationResult<()>;
}

/// [`GuildGateway`] over the Discord HTTP API
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
    bot_name: String,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, bot_name: impl Into<String>) -> Self {
        Self {
            http,
            bot_name: bot_name.into(),
        }
    }

    async fn guild_channel(&self, channel_id: u64) -> ModerationResult<GuildChannel> {
        let http: &Http = &self.http;
        let channel = ChannelId::new(channel_id)
            .to_channel(http)
            .await
            .map_err(|e| ModerationError::from_gateway(e, "view_channel"))?;

        channel.guild().ok_or_else(|| {
            ModerationError::GuildOrMemberNotFound(format!("{channel_id} is not a guild channel"))
        })
    }

    async fn latest_messages(&self, channel_id: u64, limit: u8) -> ModerationResult<Vec<Message>> {
        let http: &Http = &self.http;
        ChannelId::new(channel_id)
            .messages(http, GetMessages::new().limit(limit))
            .await
            .map_err(|e| ModerationError::from_gateway(e, "read_message_history"))
    }

    /// Bulk delete what Discord allows, one by one for anything older
    async fn delete_messages(&self, channel_id: u64, messages: &[Message]) -> ModerationResult<usize> {
        let http: &Http = &self.http;
        let channel = ChannelId::new(channel_id);
        let (recent, old) = split_by_age(messages, Utc::now());

        if !recent.is_empty() {
            channel
                .delete_messages(http, &recent)
                .await
                .map_err(|e| ModerationError::from_gateway(e, "manage_messages"))?;
        }
        for id in &old {
            channel
                .delete_message(http, *id)
                .await
                .map_err(|e| ModerationError::from_gateway(e, "manage_messages"))?;
        }

        debug!(channel_id, bulk = recent.len(), single = old.len(), "Deleted messages");
        Ok(recent.len() + old.len())
    }
}

/// Whether a message sent at `sent_at` (unix seconds) may be bulk deleted
fn bulk_deletable(sent_at: i64, now: DateTime<Utc>) -> bool {
    sent_at > (now - TimeDelta::days(BULK_DELETE_MAX_AGE_DAYS)).timestamp()
}

/// Message ids young enough for a bulk delete, and the rest
fn split_by_age(messages: &[Message], now: DateTime<Utc>) -> (Vec<MessageId>, Vec<MessageId>) {
    let (recent, old): (Vec<&Message>, Vec<&Message>) = messages
        .iter()
        .partition(|message| bulk_deletable(message.timestamp.unix_timestamp(), now));
    (
        recent.into_iter().map(|message| message.id).collect(),
        old.into_iter().map(|message| message.id).collect(),
    )
}

fn role_overwrite(channel: &GuildChannel, role_id: u64) -> RoleOverride {
    let role = PermissionOverwriteType::Role(RoleId::new(role_id));
    channel
        .permission_overwrites
        .iter()
        .find(|overwrite| overwrite.kind == role)
        .map_or_else(RoleOverride::default, |overwrite| RoleOverride {
            allow: overwrite.allow.bits(),
            deny: overwrite.deny.bits(),
        })
}

/// Overwrite targeting the `@everyone` role, which shares the guild's id
fn everyone_overwrite(channel: &GuildChannel, guild_id: u64) -> Option<&PermissionOverwrite> {
    let everyone = RoleId::new(guild_id);
    channel
        .permission_overwrites
        .iter()
        .find(|overwrite| overwrite.kind == PermissionOverwriteType::Role(everyone))
}

fn send_messages_state(overwrite: Option<&PermissionOverwrite>) -> Option<bool> {
    let overwrite = overwrite?;
    if overwrite.deny.contains(Permissions::SEND_MESSAGES) {
        Some(false)
    } else if overwrite.allow.contains(Permissions::SEND_MESSAGES) {
        Some(true)
    } else {
        None
    }
}

#[async_trait]
impl GuildGateway for SerenityGateway {
    async fn guild_exists(&self, guild_id: u64) -> ModerationResult<bool> {
        let http: &Http = &self.http;
        match GuildId::new(guild_id).to_partial_guild(http).await {
            Ok(_) => Ok(true),
            Err(e) if matches!(http_status(&e), Some(403 | 404)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn bot_name(&self) -> String {
        self.bot_name.clone()
    }

    async fn get_member(&self, guild_id: u64, user_id: u64) -> ModerationResult<Option<MemberInfo>> {
        let http: &Http = &self.http;
        match http
            .get_member(GuildId::new(guild_id), UserId::new(user_id))
            .await
        {
            Ok(member) => Ok(Some(MemberInfo::from(&member))),
            Err(e) if http_status(&e) == Some(404) => Ok(None),
            Err(e) => Err(ModerationError::from_gateway(e, "view_members")),
        }
    }

    async fn username(&self, user_id: u64) -> ModerationResult<String> {
        let http: &Http = &self.http;
        let user = UserId::new(user_id).to_user(http).await?;
        Ok(user.tag())
    }

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> ModerationResult<()> {
        let http: &Http = &self.http;
        GuildId::new(guild_id)
            .kick_with_reason(http, UserId::new(user_id), reason)
            .await
            .map_err(|e| ModerationError::from_gateway(e, "kick_members"))
    }

    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> ModerationResult<()> {
        let http: &Http = &self.http;
        GuildId::new(guild_id)
            .ban_with_reason(http, UserId::new(user_id), BAN_DELETE_MESSAGE_DAYS, reason)
            .await
            .map_err(|e| ModerationError::from_gateway(e, "ban_members"))
    }

    async fn unban(&self, guild_id: u64, user_id: u64) -> ModerationResult<()> {
        let http: &Http = &self.http;
        GuildId::new(guild_id)
            .unban(http, UserId::new(user_id))
            .await
            .map_err(|e| ModerationError::from_gateway(e, "ban_members"))
    }

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()> {
        self.http
            .add_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                None,
            )
            .await
            .map_err(|e| ModerationError::from_gateway(e, "manage_roles"))
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()> {
        self.http
            .remove_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                None,
            )
            .await
            .map_err(|e| ModerationError::from_gateway(e, "manage_roles"))
    }

    async fn text_channels(&self, guild_id: u64) -> ModerationResult<Vec<TextChannelInfo>> {
        let http: &Http = &self.http;
        let channels = GuildId::new(guild_id)
            .channels(http)
            .await
            .map_err(|e| ModerationError::from_gateway(e, "view_channel"))?;

        let mut text: Vec<TextChannelInfo> = channels
            .values()
            .filter(|channel| channel.kind == ChannelType::Text)
            .map(|channel| TextChannelInfo {
                channel_id: channel.id.get(),
                name: channel.name.clone(),
                everyone_send_messages: send_messages_state(everyone_overwrite(channel, guild_id)),
            })
            .collect();
        text.sort_by_key(|channel| channel.channel_id);
        Ok(text)
    }

    async fn set_everyone_send_messages(
        &self,
        guild_id: u64,
        channel_id: u64,
        value: Option<bool>,
    ) -> ModerationResult<()> {
        let http: &Http = &self.http;
        let channel = self.guild_channel(channel_id).await?;

        // Only the send-messages bit changes; the rest of the overwrite stays
        let (mut allow, mut deny) = everyone_overwrite(&channel, guild_id)
            .map_or((Permissions::empty(), Permissions::empty()), |o| (o.allow, o.deny));
        allow.remove(Permissions::SEND_MESSAGES);
        deny.remove(Permissions::SEND_MESSAGES);
        match value {
            Some(true) => allow.insert(Permissions::SEND_MESSAGES),
            Some(false) => deny.insert(Permissions::SEND_MESSAGES),
            None => {}
        }

        let kind = PermissionOverwriteType::Role(RoleId::new(guild_id));
        let result = if allow.is_empty() && deny.is_empty() {
            channel.id.delete_permission(http, kind).await
        } else {
            channel
                .id
                .create_permission(http, PermissionOverwrite { allow, deny, kind })
                .await
        };

        debug!(guild_id, channel_id, ?value, "Updated @everyone send-messages override");
        result.map_err(|e| ModerationError::from_gateway(e, "manage_roles"))
    }

    async fn find_text_channel(&self, guild_id: u64, name: &str) -> ModerationResult<Option<u64>> {
        Ok(self
            .text_channels(guild_id)
            .await?
            .into_iter()
            .find(|channel| channel.name == name)
            .map(|channel| channel.channel_id))
    }

    async fn send_message(&self, channel_id: u64, content: &str) -> ModerationResult<u64> {
        let http: &Http = &self.http;
        let message = ChannelId::new(channel_id)
            .say(http, content)
            .await
            .map_err(|e| ModerationError::from_gateway(e, "send_messages"))?;
        Ok(message.id.get())
    }

    async fn send_embed(&self, channel_id: u64, embed: &LogEmbed) -> ModerationResult<()> {
        let http: &Http = &self.http;

        let mut builder = CreateEmbed::new().title(&embed.title).colour(embed.colour);
        if let Some(description) = &embed.description {
            builder = builder.description(description);
        }
        for (name, value) in &embed.fields {
            builder = builder.field(name, value, false);
        }
        if let Some(footer) = &embed.footer {
            builder = builder.footer(CreateEmbedFooter::new(footer));
        }
        if let Some(Ok(timestamp)) = embed
            .timestamp
            .map(|at| Timestamp::from_unix_timestamp(at.timestamp()))
        {
            builder = builder.timestamp(timestamp);
        }

        ChannelId::new(channel_id)
            .send_message(http, CreateMessage::new().embed(builder))
            .await
            .map_err(|e| ModerationError::from_gateway(e, "embed_links"))?;
        Ok(())
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> ModerationResult<()> {
        let http: &Http = &self.http;
        ChannelId::new(channel_id)
            .edit_message(
                http,
                MessageId::new(message_id),
                EditMessage::new().content(content),
            )
            .await
            .map_err(|e| ModerationError::from_gateway(e, "send_messages"))?;
        Ok(())
    }

    async fn set_slowmode(&self, channel_id: u64, seconds: u16) -> ModerationResult<()> {
        let http: &Http = &self.http;
        ChannelId::new(channel_id)
            .edit(http, EditChannel::new().rate_limit_per_user(seconds))
            .await
            .map_err(|e| ModerationError::from_gateway(e, "manage_channels"))?;
        Ok(())
    }

    async fn purge(&self, channel_id: u64, count: u8) -> ModerationResult<usize> {
        let messages = self.latest_messages(channel_id, count).await?;
        self.delete_messages(channel_id, &messages).await
    }

    async fn purge_bot_messages(&self, channel_id: u64, limit: u8) -> ModerationResult<usize> {
        let messages: Vec<Message> = self
            .latest_messages(channel_id, limit)
            .await?
            .into_iter()
            .filter(|message| message.author.bot)
            .collect();
        self.delete_messages(channel_id, &messages).await
    }

    async fn role_overrides(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> ModerationResult<Vec<ChannelOverride>> {
        let http: &Http = &self.http;
        let channels = GuildId::new(guild_id)
            .channels(http)
            .await
            .map_err(|e| ModerationError::from_gateway(e, "view_channel"))?;

        let mut overrides: Vec<ChannelOverride> = channels
            .values()
            .map(|channel| ChannelOverride {
                channel_id: channel.id.get(),
                name: channel.name.clone(),
                kind: u8::from(channel.kind),
                role_override: role_overwrite(channel, role_id),
            })
            .collect();
        overrides.sort_by_key(|channel| channel.channel_id);
        Ok(overrides)
    }

    async fn set_role_override(
        &self,
        channel_id: u64,
        role_id: u64,
        value: RoleOverride,
    ) -> ModerationResult<()> {
        let http: &Http = &self.http;
        let channel = ChannelId::new(channel_id);
        let kind = PermissionOverwriteType::Role(RoleId::new(role_id));

        let result = if value.is_empty() {
            match channel.delete_permission(http, kind).await {
                Err(e) if http_status(&e) == Some(404) => Ok(()),
                other => other,
            }
        } else {
            let overwrite = PermissionOverwrite {
                allow: Permissions::from_bits_truncate(value.allow),
                deny: Permissions::from_bits_truncate(value.deny),
                kind,
            };
            channel.create_permission(http, overwrite).await
        };
        result.map_err(|e| ModerationError::from_gateway(e, "manage_roles"))
    }
}

/// Bounds every call of an inner gateway by a fixed time limit
///
/// Commands and the scheduler hold a guild's state lock while they call the
/// gateway, so an unanswered request must not keep that lock forever.
pub struct TimeoutGateway {
    inner: Arc<dyn GuildGateway>,
    limit: Duration,
}

impl TimeoutGateway {
    pub fn new(inner: Arc<dyn GuildGateway>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = ModerationResult<T>>,
    ) -> ModerationResult<T> {
        if let Ok(result) = timeout(self.limit, call).await {
            result
        } else {
            warn!(operation, limit = ?self.limit, "Gateway call timed out");
            Err(ModerationError::Timeout(operation.to_string()))
        }
    }
}

#[async_trait]
impl GuildGateway for TimeoutGateway {
    async fn guild_exists(&self, guild_id: u64) -> ModerationResult<bool> {
        self.bounded("guild lookup", self.inner.guild_exists(guild_id))
            .await
    }

    fn bot_name(&self) -> String {
        self.inner.bot_name()
    }

    async fn get_member(&self, guild_id: u64, user_id: u64) -> ModerationResult<Option<MemberInfo>> {
        self.bounded("member lookup", self.inner.get_member(guild_id, user_id))
            .await
    }

    async fn username(&self, user_id: u64) -> ModerationResult<String> {
        self.bounded("user lookup", self.inner.username(user_id))
            .await
    }

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> ModerationResult<()> {
        self.bounded("kick", self.inner.kick(guild_id, user_id, reason))
            .await
    }

    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> ModerationResult<()> {
        self.bounded("ban", self.inner.ban(guild_id, user_id, reason))
            .await
    }

    async fn unban(&self, guild_id: u64, user_id: u64) -> ModerationResult<()> {
        self.bounded("unban", self.inner.unban(guild_id, user_id))
            .await
    }

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()> {
        self.bounded("add role", self.inner.add_role(guild_id, user_id, role_id))
            .await
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> ModerationResult<()> {
        self.bounded("remove role", self.inner.remove_role(guild_id, user_id, role_id))
            .await
    }

    async fn text_channels(&self, guild_id: u64) -> ModerationResult<Vec<TextChannelInfo>> {
        self.bounded("channel list", self.inner.text_channels(guild_id))
            .await
    }

    async fn set_everyone_send_messages(
        &self,
        guild_id: u64,
        channel_id: u64,
        value: Option<bool>,
    ) -> ModerationResult<()> {
        self.bounded(
            "channel override",
            self.inner
                .set_everyone_send_messages(guild_id, channel_id, value),
        )
        .await
    }

    async fn find_text_channel(&self, guild_id: u64, name: &str) -> ModerationResult<Option<u64>> {
        self.bounded("channel lookup", self.inner.find_text_channel(guild_id, name))
            .await
    }

    async fn send_message(&self, channel_id: u64, content: &str) -> ModerationResult<u64> {
        self.bounded("send message", self.inner.send_message(channel_id, content))
            .await
    }

    async fn send_embed(&self, channel_id: u64, embed: &LogEmbed) -> ModerationResult<()> {
        self.bounded("send embed", self.inner.send_embed(channel_id, embed))
            .await
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> ModerationResult<()> {
        self.bounded(
            "edit message",
            self.inner.edit_message(channel_id, message_id, content),
        )
        .await
    }

    async fn set_slowmode(&self, channel_id: u64, seconds: u16) -> ModerationResult<()> {
        self.bounded("slowmode", self.inner.set_slowmode(channel_id, seconds))
            .await
    }

    async fn purge(&self, channel_id: u64, count: u8) -> ModerationResult<usize> {
        self.bounded("purge", self.inner.purge(channel_id, count))
            .await
    }

    async fn purge_bot_messages(&self, channel_id: u64, limit: u8) -> ModerationResult<usize> {
        self.bounded("bot purge", self.inner.purge_bot_messages(channel_id, limit))
            .await
    }

    async fn role_overrides(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> ModerationResult<Vec<ChannelOverride>> {
        self.bounded("role overrides", self.inner.role_overrides(guild_id, role_id))
            .await
    }

    async fn set_role_override(
        &self,
        channel_id: u64,
        role_id: u64,
        value: RoleOverride,
    ) -> ModerationResult<()> {
        self.bounded(
            "role override",
            self.inner.set_role_override(channel_id, role_id, value),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overwrite(allow: Permissions, deny: Permissions) -> PermissionOverwrite {
        PermissionOverwrite {
            allow,
            deny,
            kind: PermissionOverwriteType::Role(RoleId::new(1)),
        }
    }

    #[test]
    fn test_send_messages_state() {
        assert_eq!(send_messages_state(None), None);
        assert_eq!(
            send_messages_state(Some(&overwrite(Permissions::empty(), Permissions::SEND_MESSAGES))),
            Some(false)
        );
        assert_eq!(
            send_messages_state(Some(&overwrite(Permissions::SEND_MESSAGES, Permissions::empty()))),
            Some(true)
        );
        assert_eq!(
            send_messages_state(Some(&overwrite(Permissions::ADD_REACTIONS, Permissions::empty()))),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_gateway_gives_up_on_stalled_calls() {
        use crate::moderation::testing::{BOT_NAME, FakeGateway};

        let fake = Arc::new(FakeGateway::new());
        fake.add_guild(1);
        fake.stall("unban");
        let gateway = TimeoutGateway::new(fake.clone(), Duration::from_secs(10));

        let started = tokio::time::Instant::now();
        let result = gateway.unban(1, 2).await;
        assert!(matches!(result, Err(ModerationError::Timeout(ref op)) if op == "unban"));
        assert!(started.elapsed() >= Duration::from_secs(10));

        // Calls that answer pass straight through
        assert!(gateway.guild_exists(1).await.unwrap());
        gateway.ban(1, 2, "spam").await.unwrap();
        assert!(fake.is_banned(1, 2));
        assert_eq!(gateway.bot_name(), BOT_NAME);
    }

    #[test]
    fn test_bulk_delete_age_limit() {
        let now = Utc::now();
        assert!(bulk_deletable(now.timestamp(), now));
        assert!(bulk_deletable((now - TimeDelta::days(13)).timestamp(), now));
        assert!(!bulk_deletable((now - TimeDelta::days(15)).timestamp(), now));
    }

    #[test]
    fn test_role_override_is_empty() {
        assert!(RoleOverride::default().is_empty());
        assert!(!RoleOverride { allow: 0, deny: 1 }.is_empty());
    }

    #[test]
    fn test_member_has_role() {
        let member = MemberInfo {
            user_id: 1,
            username: "someone".to_string(),
            role_ids: vec![5, 6],
        };
        assert!(member.has_role(6));
        assert!(!member.has_role(7));
    }
}
