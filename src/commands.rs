//! Moderator commands
//!
//! Every command is guild-only and declares the permission the invoker needs;
//! poise checks it before the body runs. Failures bubble up as
//! [`ModerationError`] and are turned into a reply by [`on_error`].

use poise::serenity_prelude::{self as serenity, Mentionable};
use poise::{FrameworkError, command};
use tracing::warn;

use crate::moderation::{
    ModerationError, RAID_METHOD_HELP, RaidMethod, TargetUser, render_warnings,
};
use crate::{Context, Data, Error, logging};

const OK_HAND: &str = ":ok_hand:";
const DEFAULT_SLOWMODE_SECS: u16 = 10;
const DEFAULT_BOT_PURGE_LIMIT: u8 = 50;

/// Every command the bot registers
#[must_use]
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        warn(),
        mute(),
        tempmute(),
        kick(),
        ban(),
        tempban(),
        forceban(),
        softban(),
        amend_reason(),
        raidmode(),
        slowmode(),
        purge(),
        purge_bot(),
        copyperms(),
        mutedrole(),
    ]
}

fn guild_id(ctx: Context<'_>) -> Result<u64, Error> {
    ctx.guild_id()
        .map(serenity::GuildId::get)
        .ok_or_else(|| ModerationError::GuildOrMemberNotFound("guild".to_string()).into())
}

fn moderator(ctx: Context<'_>) -> String {
    ctx.author().tag()
}

fn target(member: &serenity::Member) -> TargetUser {
    TargetUser::new(member.user.id.get(), member.user.tag())
}

/// Accept a raw id or a user mention
fn parse_user_id(raw: &str) -> Option<u64> {
    let trimmed = raw
        .trim()
        .trim_start_matches("<@")
        .trim_start_matches('!')
        .trim_end_matches('>');
    trimmed.parse().ok().filter(|id| *id != 0)
}

/// Text shown to the moderator when a command fails
fn error_reply(error: &Error) -> String {
    match error.downcast_ref::<ModerationError>() {
        Some(e) => e.user_message(),
        None => format!("Something went wrong: {error}"),
    }
}

/// Framework error hook: log, then tell the invoker what went wrong
pub async fn on_error(error: FrameworkError<'_, Data, Error>) {
    logging::log_command_error(&error);
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            if let Err(e) = ctx.say(error_reply(&error)).await {
                warn!("Failed to send error reply: {e}");
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                warn!("Failed to handle framework error: {e}");
            }
        }
    }
}

async fn warn_member(
    ctx: Context<'_>,
    member: &serenity::Member,
    reason: Option<&str>,
) -> Result<(), Error> {
    let outcome = ctx
        .data()
        .service
        .warn(guild_id(ctx)?, &target(member), reason, &moderator(ctx))
        .await?;
    ctx.say(outcome.message(&member.mention().to_string())).await?;
    Ok(())
}

/// Warns a member (for moderator reference).
///
/// As a slash command this is a group; use `/warn add` or `/warn list`.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("warning"),
    subcommands("warn_add", "warn_list"),
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    warn_member(ctx, &member, reason.as_deref()).await
}

/// Warns a member (for moderator reference).
#[command(
    slash_command,
    guild_only,
    rename = "add",
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn warn_add(
    ctx: Context<'_>,
    #[description = "Member to warn"] member: serenity::Member,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    warn_member(ctx, &member, reason.as_deref()).await
}

/// Finds a list of a user's previous warnings.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "list",
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn warn_list(
    ctx: Context<'_>,
    #[description = "Member to look up"] member: serenity::Member,
) -> Result<(), Error> {
    let warnings = ctx
        .data()
        .service
        .warn_list(guild_id(ctx)?, member.user.id.get())
        .await;
    ctx.say(render_warnings(&member.mention().to_string(), &warnings, false))
        .await?;
    Ok(())
}

/// Toggles mute on a member.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute or unmute"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.data()
        .service
        .mute(guild_id(ctx)?, &target(&member), reason.as_deref(), &moderator(ctx))
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Temporarily mutes a member.
///
/// Duration must be in format X[m/h/d/w/mo/y] (e.g. `15d38m`).
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn tempmute(
    ctx: Context<'_>,
    #[description = "Member to mute"] member: serenity::Member,
    #[description = "How long, e.g. 15d38m"] duration: String,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.data()
        .service
        .tempmute(
            guild_id(ctx)?,
            &target(&member),
            &duration,
            reason.as_deref(),
            &moderator(ctx),
        )
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Kicks a member and logs it to the audit channel.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.data()
        .service
        .kick(guild_id(ctx)?, &target(&member), reason.as_deref(), &moderator(ctx))
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Bans a member and logs it to the audit channel.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member to ban"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.data()
        .service
        .ban(guild_id(ctx)?, &target(&member), reason.as_deref(), &moderator(ctx))
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Tempbans a member and logs it to the audit channel.
///
/// Duration must be in format X[m/h/d/w/mo/y] (e.g. `15d38m`).
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS"
)]
pub async fn tempban(
    ctx: Context<'_>,
    #[description = "Member to ban"] member: serenity::Member,
    #[description = "How long, e.g. 15d38m"] duration: String,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.data()
        .service
        .tempban(
            guild_id(ctx)?,
            &target(&member),
            &duration,
            reason.as_deref(),
            &moderator(ctx),
        )
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Force-bans a user id, even if they are not in the server.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS"
)]
pub async fn forceban(
    ctx: Context<'_>,
    #[description = "User id or mention"] user: String,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(user_id) = parse_user_id(&user) else {
        ctx.say(format!("`{user}` is not a user id.")).await?;
        return Ok(());
    };
    ctx.data()
        .service
        .forceban(guild_id(ctx)?, user_id, reason.as_deref(), &moderator(ctx))
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Softbans a member (ban and unban to clear their messages).
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS"
)]
pub async fn softban(
    ctx: Context<'_>,
    #[description = "Member to softban"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    ctx.data()
        .service
        .softban(guild_id(ctx)?, &target(&member), reason.as_deref(), &moderator(ctx))
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Sets the reason for a case in the audit channel.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "reason",
    required_permissions = "KICK_MEMBERS"
)]
pub async fn amend_reason(
    ctx: Context<'_>,
    #[description = "Case number"] case_number: u64,
    #[description = "New reason"]
    #[rest]
    reason: String,
) -> Result<(), Error> {
    ctx.data()
        .service
        .amend_reason(guild_id(ctx)?, case_number, &reason, &moderator(ctx))
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}

/// Toggles raid mode. Methods: kick, ban, lockdown
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS"
)]
pub async fn raidmode(
    ctx: Context<'_>,
    #[description = "kick, ban or lockdown"] method: Option<String>,
) -> Result<(), Error> {
    let method = match method.as_deref().map_or(Ok(RaidMethod::default()), str::parse) {
        Ok(method) => method,
        Err(_) => {
            ctx.say(RAID_METHOD_HELP).await?;
            return Ok(());
        }
    };
    let toggle = ctx
        .data()
        .service
        .toggle_raid_mode(guild_id(ctx)?, method)
        .await?;
    ctx.say(toggle.message()).await?;
    Ok(())
}

/// Slows a channel.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn slowmode(
    ctx: Context<'_>,
    #[description = "Seconds between messages (default 10)"]
    #[max = 21600]
    seconds: Option<u16>,
    #[description = "Channel (default: this one)"] channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let seconds = seconds.unwrap_or(DEFAULT_SLOWMODE_SECS);
    let channel = match channel {
        Some(channel) => Some(channel),
        None => ctx.guild_channel().await,
    };
    let Some(channel) = channel else {
        ctx.say("Failed to set ratelimit.").await?;
        return Ok(());
    };

    match ctx.data().service.slowmode(channel.id.get(), seconds).await {
        Ok(()) => {
            ctx.say(format!("Ratelimit set to {seconds} seconds in {}.", channel.name))
                .await?;
        }
        Err(e) => {
            warn!(channel_id = channel.id.get(), "Slowmode failed: {e}");
            ctx.say("Failed to set ratelimit.").await?;
        }
    }
    Ok(())
}

/// Purges messages from the channel.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many messages"]
    #[min = 1]
    #[max = 99]
    count: u8,
) -> Result<(), Error> {
    // A prefix invocation is itself the newest message
    let count = match ctx {
        poise::Context::Prefix(_) => count.saturating_add(1),
        poise::Context::Application(_) => count,
    };

    match ctx.data().service.purge(ctx.channel_id().get(), count).await {
        Ok(deleted) => {
            if let poise::Context::Application(_) = ctx {
                ctx.say(format!("Deleted {deleted} messages.")).await?;
            }
        }
        Err(e) => {
            ctx.say(format!("Failed to purge: {e}")).await?;
        }
    }
    Ok(())
}

/// Purges bot messages from the last [limit] messages (default 50).
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn purge_bot(
    ctx: Context<'_>,
    #[description = "How many recent messages to look through"]
    #[min = 1]
    #[max = 100]
    limit: Option<u8>,
) -> Result<(), Error> {
    let limit = limit.unwrap_or(DEFAULT_BOT_PURGE_LIMIT);
    let deleted = ctx
        .data()
        .service
        .purge_bot_messages(ctx.channel_id().get(), limit)
        .await?;
    ctx.say(format!("Cleaned {deleted} messages.")).await?;
    Ok(())
}

/// Copies one role's permission override from a channel to all others of
/// the same type.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn copyperms(
    ctx: Context<'_>,
    #[description = "Role whose override is copied"] role: serenity::Role,
    #[description = "Channel to copy from"] source: serenity::GuildChannel,
    #[description = "Replace overrides the other channels already have"] overwrite: Option<bool>,
) -> Result<(), Error> {
    let skipped = ctx
        .data()
        .service
        .copy_role_overrides(
            guild_id(ctx)?,
            role.id.get(),
            source.id.get(),
            overwrite.unwrap_or(false),
        )
        .await?;
    ctx.say(copyperms_reply(&role.name, &source.name, &skipped))
        .await?;
    Ok(())
}

fn copyperms_reply(role: &str, source: &str, skipped: &[String]) -> String {
    if skipped.is_empty() {
        OK_HAND.to_string()
    } else {
        format!(
            "{OK_HAND}\nSkipped {}; use `.copyperms {role} {source} true` to overwrite existing.",
            skipped.join(", ")
        )
    }
}

/// Sets the role used for mutes in this server.
#[command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn mutedrole(
    ctx: Context<'_>,
    #[description = "Role given to muted members"] role: serenity::Role,
) -> Result<(), Error> {
    ctx.data()
        .service
        .set_muted_role(guild_id(ctx)?, role.id.get())
        .await?;
    ctx.say(OK_HAND).await?;
    Ok(())
}
