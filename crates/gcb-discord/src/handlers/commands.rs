use anyhow::anyhow;
use poise::serenity_prelude as serenity;
use tracing::debug;

use gcb_core::{
    commands::{self, Access, SetChannelOutcome},
    domain::{ChannelId, GuildId},
    formatting,
};

use crate::card_reply;
use crate::router::{Context, Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![ping(), prompt(), setchannel(), removechannel(), help()]
}

fn guild_id(ctx: Context<'_>) -> Option<GuildId> {
    ctx.guild_id().map(|g| GuildId(g.get()))
}

fn channel_id(ctx: Context<'_>) -> ChannelId {
    ChannelId(ctx.channel_id().get())
}

/// Check the current latency of the bot.
#[poise::command(slash_command, prefix_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.send(card_reply(&formatting::ping_card(latency))).await?;
    Ok(())
}

/// Send a prompt to GeminiAPI
#[poise::command(slash_command, prefix_command)]
pub async fn prompt(
    ctx: Context<'_>,
    #[description = "The prompt to send"]
    #[rest]
    prompt: String,
) -> Result<(), Error> {
    let handle = ctx.send(card_reply(&formatting::generating_card())).await?;
    let card = commands::prompt(&ctx.data().relay, channel_id(ctx), &prompt).await;
    handle.edit(ctx, card_reply(&card)).await?;
    Ok(())
}

/// Set the channel for the chatbot
#[poise::command(slash_command, prefix_command)]
pub async fn setchannel(
    ctx: Context<'_>,
    #[description = "Channel to use (defaults to this one)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let handle = ctx
        .send(card_reply(&formatting::notice_card("Setting the channel...")))
        .await?;

    let access = invoker_access(ctx).await;
    let outcome = commands::set_channel(
        &ctx.data().relay,
        access,
        guild_id(ctx),
        channel_id(ctx),
        channel.map(|c| ChannelId(c.id.get())),
    )
    .await?;

    if let SetChannelOutcome::Moved { old, .. } = outcome {
        describe_old_channel(ctx, old).await;
    }

    handle.edit(ctx, card_reply(&outcome.card())).await?;
    Ok(())
}

/// Remove the channel set for the chatbot
#[poise::command(slash_command, prefix_command)]
pub async fn removechannel(ctx: Context<'_>) -> Result<(), Error> {
    let handle = ctx
        .send(card_reply(&formatting::notice_card("Removing the channel...")))
        .await?;

    let access = invoker_access(ctx).await;
    let outcome = commands::remove_channel(&ctx.data().relay, access, guild_id(ctx)).await?;

    handle.edit(ctx, card_reply(&outcome.card())).await?;
    Ok(())
}

/// The help command which lists out all the basic information and commands for using the bot
#[poise::command(slash_command, prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(card_reply(&formatting::help_card())).await?;
    Ok(())
}

/// Outside a guild there is nothing to check; the core handler answers
/// with the guild-only card before looking at access.
async fn invoker_access(ctx: Context<'_>) -> Access {
    if ctx.guild_id().is_none() {
        return Access::Denied;
    }
    Access::from_probe(can_manage_channels(ctx).await)
}

/// Whether the invoking member holds "Manage Channels" guild-wide.
async fn can_manage_channels(ctx: Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| anyhow!("command invoked outside a guild"))?;
    let member = ctx
        .author_member()
        .await
        .ok_or_else(|| anyhow!("author is not a member of guild {guild_id}"))?;

    let guild = ctx
        .guild()
        .ok_or_else(|| anyhow!("guild {guild_id} is not cached"))?;
    Ok(member_manages_channels(&guild, &member))
}

/// Guild-level permissions: owner, or the union of `@everyone` and the
/// member's roles. Channel overwrites are not consulted.
fn member_manages_channels(guild: &serenity::Guild, member: &serenity::Member) -> bool {
    if guild.owner_id == member.user.id {
        return true;
    }
    let everyone = guild
        .roles
        .get(&serenity::RoleId::new(guild.id.get()))
        .map(|r| r.permissions);
    let roles = member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .map(|r| r.permissions);
    grants_manage_channels(everyone.into_iter().chain(roles))
}

fn grants_manage_channels(perms: impl IntoIterator<Item = serenity::Permissions>) -> bool {
    let all = perms
        .into_iter()
        .fold(serenity::Permissions::empty(), |acc, p| acc | p);
    all.administrator() || all.manage_channels()
}

/// Best-effort lookup of the previously bound channel, for the logs only.
async fn describe_old_channel(ctx: Context<'_>, old: ChannelId) {
    match serenity::ChannelId::new(old.0).to_channel(ctx).await {
        Ok(ch) => debug!(channel = %ch, "replaced previous relay channel"),
        Err(e) => debug!(channel_id = old.0, error = %e, "previous relay channel is unavailable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::Permissions;

    #[test]
    fn manage_channels_from_any_role_grants_access() {
        assert!(grants_manage_channels([
            Permissions::SEND_MESSAGES,
            Permissions::MANAGE_CHANNELS,
        ]));
    }

    #[test]
    fn administrator_implies_manage_channels() {
        assert!(grants_manage_channels([Permissions::ADMINISTRATOR]));
    }

    #[test]
    fn ordinary_roles_are_denied() {
        assert!(!grants_manage_channels([
            Permissions::SEND_MESSAGES,
            Permissions::READ_MESSAGE_HISTORY,
        ]));
        assert!(!grants_manage_channels(std::iter::empty()));
    }
}
