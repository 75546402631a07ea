use chrono::{DateTime, Utc};
use poise::serenity_prelude::{
    self as serenity, ChannelId, Context, EventHandler, GuildId, GuildMemberUpdateEvent, Member,
    Message, MessageId, MessageUpdateEvent, Ready, Timestamp, User,
};
use tracing::{debug, error, info, warn};

use crate::EVENT_TARGET;
use crate::moderation::{LoggedMessage, MemberInfo, ModerationService};

/// Gateway events that feed the moderation engine
pub struct Handler {
    service: ModerationService,
}

impl Handler {
    #[must_use]
    pub fn new(service: ModerationService) -> Self {
        Self { service }
    }
}

fn to_utc(timestamp: Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0)
}

/// Cached channel name, or a mention when the channel is not cached
fn channel_label(ctx: &Context, guild_id: GuildId, channel_id: ChannelId) -> String {
    ctx.cache
        .guild(guild_id)
        .and_then(|guild| {
            guild
                .channels
                .get(&channel_id)
                .map(|channel| channel.name.clone())
        })
        .unwrap_or_else(|| format!("<#{channel_id}>"))
}

fn logged_message(ctx: &Context, guild_id: GuildId, message: &Message) -> LoggedMessage {
    LoggedMessage {
        author: message.author.tag(),
        channel_name: channel_label(ctx, guild_id, message.channel_id),
        content: message.content.clone(),
        attachment_urls: message.attachments.iter().map(|a| a.url.clone()).collect(),
        sent_at: to_utc(message.timestamp),
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!("Connected as {user_name}, shard {shard_id}");
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!(
            "Cache ready! The bot is in {guild_count} guild(s), {} with stored moderation state",
            self.service.store().guild_count()
        );
    }

    async fn guild_member_addition(&self, _ctx: Context, new_member: Member) {
        let guild_id = new_member.guild_id.get();
        let member = MemberInfo::from(&new_member);
        match self.service.on_member_join(guild_id, &member).await {
            Ok(cases) if !cases.is_empty() => {
                info!(
                    target: EVENT_TARGET,
                    guild_id,
                    user_id = member.user_id,
                    cases = cases.len(),
                    "Join handled with moderation action"
                );
            }
            Ok(_) => {}
            Err(e) => error!(target: EVENT_TARGET, guild_id, user_id = member.user_id, "Join handling failed: {e}"),
        }
    }

    async fn guild_ban_addition(&self, _ctx: Context, guild_id: GuildId, banned_user: User) {
        let result = self
            .service
            .on_member_ban(guild_id.get(), banned_user.id.get(), &banned_user.tag())
            .await;
        if let Err(e) = result {
            error!(target: EVENT_TARGET, guild_id = guild_id.get(), "Failed to record ban: {e}");
        }
    }

    async fn guild_ban_removal(&self, _ctx: Context, guild_id: GuildId, unbanned_user: User) {
        let result = self
            .service
            .on_member_unban(guild_id.get(), unbanned_user.id.get(), &unbanned_user.tag())
            .await;
        if let Err(e) = result {
            error!(target: EVENT_TARGET, guild_id = guild_id.get(), "Failed to record unban: {e}");
        }
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        _old_if_available: Option<Member>,
        _new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        let role_ids: Vec<u64> = event.roles.iter().map(|role| role.get()).collect();
        let result = self
            .service
            .on_member_roles_changed(
                event.guild_id.get(),
                event.user.id.get(),
                &event.user.tag(),
                &role_ids,
            )
            .await;
        match result {
            Ok(Some(case)) => debug!(target: EVENT_TARGET, case = case.number, "Recorded manual mute change"),
            Ok(None) => {}
            Err(e) => error!(target: EVENT_TARGET, guild_id = event.guild_id.get(), "Failed to record role change: {e}"),
        }
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let Some(guild_id) = guild_id else {
            return;
        };
        let cached = ctx
            .cache
            .message(channel_id, deleted_message_id)
            .map(|message| Message::clone(&message));
        let Some(message) = cached else {
            debug!(target: EVENT_TARGET, %deleted_message_id, "Deleted message was not cached");
            return;
        };

        let logged = logged_message(&ctx, guild_id, &message);
        if let Err(e) = self.service.on_message_delete(guild_id.get(), &logged).await {
            warn!(target: EVENT_TARGET, guild_id = guild_id.get(), "Failed to log deleted message: {e}");
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let Some(guild_id) = event.guild_id else {
            return;
        };
        // Embed unfurls arrive as updates without content
        let Some(new_content) = event.content.as_deref() else {
            return;
        };
        let Some(before) = old_if_available else {
            debug!(target: EVENT_TARGET, message_id = %event.id, "Edited message was not cached");
            return;
        };

        let logged = logged_message(&ctx, guild_id, &before);
        if let Err(e) = self
            .service
            .on_message_edit(guild_id.get(), &logged, new_content)
            .await
        {
            warn!(target: EVENT_TARGET, guild_id = guild_id.get(), "Failed to log edited message: {e}");
        }
    }
}
