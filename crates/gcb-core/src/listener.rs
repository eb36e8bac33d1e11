//! Passive relay of messages posted in a guild's bound channel.

use crate::{
    domain::{ChannelId, GuildId, MessageRef},
    formatting::{self, split_message},
    messaging::{port::MessagingPort, types::ChatAction},
    relay::Relay,
    Result,
};

/// Inbound message, stripped down to what routing needs.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub guild_id: Option<GuildId>,
    pub message: MessageRef,
    pub author_is_bot: bool,
    pub author_display_name: String,
    pub content: String,
    /// The message is a prefix invocation of one of the bot's commands.
    pub is_command: bool,
}

impl InboundMessage {
    pub fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    FromBot,
    EmptyContent,
    Command,
    NoGuild,
    NoBinding,
    OtherChannel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Ignored(IgnoreReason),
    /// The model replied; `chunks` replies were posted.
    Replied { chunks: usize },
    /// The model call failed and an error reply was posted.
    Failed,
}

/// Decide whether a message is relayed. Reads the registry only when the
/// cheap filters pass.
pub async fn route(relay: &Relay, msg: &InboundMessage) -> Result<Option<IgnoreReason>> {
    if msg.author_is_bot {
        return Ok(Some(IgnoreReason::FromBot));
    }
    if msg.content.is_empty() {
        return Ok(Some(IgnoreReason::EmptyContent));
    }
    if msg.is_command {
        return Ok(Some(IgnoreReason::Command));
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(Some(IgnoreReason::NoGuild));
    };

    match relay.registry().get_binding(guild_id).await? {
        None => Ok(Some(IgnoreReason::NoBinding)),
        Some(bound) if bound != msg.channel_id() => Ok(Some(IgnoreReason::OtherChannel)),
        Some(_) => Ok(None),
    }
}

/// Handle one inbound message event.
///
/// A failed generation or a failed reply is answered in-thread with an
/// error reply. Registry faults, and a failure to post that error reply,
/// are returned for the caller to log.
pub async fn on_message(
    relay: &Relay,
    messenger: &dyn MessagingPort,
    msg: &InboundMessage,
) -> Result<RelayOutcome> {
    if let Some(reason) = route(relay, msg).await? {
        tracing::debug!(channel_id = msg.channel_id().0, ?reason, "message ignored");
        return Ok(RelayOutcome::Ignored(reason));
    }

    if let Err(e) = messenger
        .send_chat_action(msg.channel_id(), ChatAction::Typing)
        .await
    {
        tracing::debug!(error = %e, "typing indicator failed");
    }

    let composed = relay.compose_chat(&msg.author_display_name, &msg.content);
    let max_len = messenger.capabilities().max_message_len;

    let fault = match relay.ask(msg.channel_id(), &composed).await {
        Ok(text) => match reply_chunked(messenger, msg.message, &text, max_len).await {
            Ok(chunks) => return Ok(RelayOutcome::Replied { chunks }),
            Err(e) => e.to_string(),
        },
        Err(e) => e.to_string(),
    };

    tracing::warn!(channel_id = msg.channel_id().0, error = %fault, "relay failed");
    let text = formatting::truncate_chars(
        &formatting::generation_failure(&msg.content, &fault),
        max_len,
    );
    messenger.reply(msg.message, &text).await?;
    Ok(RelayOutcome::Failed)
}

/// Post `text` as one or more replies; returns the number of chunks sent.
async fn reply_chunked(
    messenger: &dyn MessagingPort,
    to: MessageRef,
    text: &str,
    max_len: usize,
) -> Result<usize> {
    let chunks = split_message(text, max_len);
    for chunk in &chunks {
        messenger.reply(to, chunk).await?;
    }
    Ok(chunks.len())
}
