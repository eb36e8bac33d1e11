//! Gateway event handlers.
//!
//! - `Ready`: refresh the presence with the served guild count
//! - `Message`: hand the message to the core relay listener

use poise::serenity_prelude as serenity;
use tracing::{debug, error};

use gcb_core::{
    domain::{ChannelId, GuildId, MessageId, MessageRef},
    formatting::presence_label,
    listener::{self, InboundMessage},
};

use crate::router::{Data, Error};
use crate::DiscordMessenger;

pub mod commands;

pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            let label = presence_label(data_about_bot.guilds.len());
            debug!(%label, "updating presence");
            ctx.set_activity(Some(serenity::ActivityData::watching(label)));
        }
        serenity::FullEvent::Message { new_message } => {
            handle_message(ctx, new_message, framework, data).await;
        }
        _ => {}
    }
    Ok(())
}

/// Never fails: faults are logged so one bad message cannot stop the loop.
async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) {
    let inbound = inbound_message(msg, &data.relay.config().command_prefix, framework);
    let messenger = DiscordMessenger::new(ctx.http.clone());

    match listener::on_message(&data.relay, &messenger, &inbound).await {
        Ok(outcome) => debug!(message_id = msg.id.get(), ?outcome, "message handled"),
        Err(e) => error!(
            message_id = msg.id.get(),
            channel_id = msg.channel_id.get(),
            error = %e,
            "message relay failed"
        ),
    }
}

fn inbound_message(
    msg: &serenity::Message,
    prefix: &str,
    framework: poise::FrameworkContext<'_, Data, Error>,
) -> InboundMessage {
    let display_name = msg
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .unwrap_or_else(|| msg.author.display_name().to_string());

    let command_names = framework.options().commands.iter().map(|c| c.name.as_str());
    let is_command = is_prefix_command(&msg.content, prefix, command_names);

    InboundMessage {
        guild_id: msg.guild_id.map(|g| GuildId(g.get())),
        message: MessageRef {
            channel_id: ChannelId(msg.channel_id.get()),
            message_id: MessageId(msg.id.get()),
        },
        author_is_bot: msg.author.bot,
        author_display_name: display_name,
        content: msg.content.clone(),
        is_command,
    }
}

/// `!name ...` where `name` is one of the registered commands.
fn is_prefix_command<'a>(
    content: &str,
    prefix: &str,
    mut command_names: impl Iterator<Item = &'a str>,
) -> bool {
    if prefix.is_empty() {
        return false;
    }
    let Some(rest) = content.strip_prefix(prefix) else {
        return false;
    };
    let Some(word) = rest.split_whitespace().next() else {
        return false;
    };
    command_names.any(|name| name == word)
}
