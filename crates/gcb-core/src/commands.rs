//! Command handlers, independent of the chat framework.
//!
//! Each handler is invoked once per user invocation and returns the card to
//! show. Relay paths (`prompt`) never fail; administrative paths propagate
//! storage faults to the caller.

use std::fmt::Display;

use crate::{
    domain::{ChannelId, GuildId},
    formatting::{self, Card},
    relay::Relay,
    Result,
};

/// Outcome of the "manage channels" permission gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Caller lacks the permission, or the permission check itself failed.
    Denied,
}

impl Access {
    /// Fold a permission probe into an access decision.
    ///
    /// A probe error is a denial. It is logged so platform faults (e.g. a
    /// missing guild context) stay visible in the logs.
    pub fn from_probe<E: Display>(probe: std::result::Result<bool, E>) -> Self {
        match probe {
            Ok(true) => Access::Granted,
            Ok(false) => Access::Denied,
            Err(e) => {
                tracing::warn!(error = %e, "permission check failed; treating as denied");
                Access::Denied
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetChannelOutcome {
    Denied,
    GuildOnly,
    Set(ChannelId),
    AlreadySet(ChannelId),
    Moved { old: ChannelId, new: ChannelId },
}

impl SetChannelOutcome {
    pub fn card(&self) -> Card {
        let text = match *self {
            SetChannelOutcome::Denied => formatting::PERMISSION_DENIED.to_string(),
            SetChannelOutcome::GuildOnly => formatting::GUILD_ONLY.to_string(),
            SetChannelOutcome::Set(ch) => formatting::channel_set(ch),
            SetChannelOutcome::AlreadySet(ch) => formatting::channel_already_set(ch),
            SetChannelOutcome::Moved { old, new } => formatting::channel_moved(old, new),
        };
        formatting::notice_card(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveChannelOutcome {
    Denied,
    GuildOnly,
    NothingToRemove,
    Removed(ChannelId),
}

impl RemoveChannelOutcome {
    pub fn card(&self) -> Card {
        let text = match self {
            RemoveChannelOutcome::Denied => formatting::PERMISSION_DENIED,
            RemoveChannelOutcome::GuildOnly => formatting::GUILD_ONLY,
            RemoveChannelOutcome::NothingToRemove => "No channel is currently set for the chatbot.",
            RemoveChannelOutcome::Removed(_) => "Channel removed for the chatbot.",
        };
        formatting::notice_card(text)
    }
}

/// `/prompt`: one model call; failures become an error card.
pub async fn prompt(relay: &Relay, channel_id: ChannelId, text: &str) -> Card {
    let composed = relay.compose_prompt(text);
    match relay.ask(channel_id, &composed).await {
        Ok(response) => formatting::prompt_card(text, &response),
        Err(e) => {
            tracing::warn!(channel_id = channel_id.0, error = %e, "prompt generation failed");
            formatting::prompt_failure_card(text, &e)
        }
    }
}

/// `/setchannel [channel]`: bind `target` (or the invoking channel).
pub async fn set_channel(
    relay: &Relay,
    access: Access,
    guild_id: Option<GuildId>,
    invoking_channel: ChannelId,
    target: Option<ChannelId>,
) -> Result<SetChannelOutcome> {
    let Some(guild_id) = guild_id else {
        return Ok(SetChannelOutcome::GuildOnly);
    };
    if access == Access::Denied {
        return Ok(SetChannelOutcome::Denied);
    }
    let target = target.unwrap_or(invoking_channel);

    let outcome = match relay.registry().get_binding(guild_id).await? {
        None => {
            relay.registry().set_binding(guild_id, target).await?;
            SetChannelOutcome::Set(target)
        }
        Some(current) if current == target => SetChannelOutcome::AlreadySet(target),
        Some(old) => {
            // Upsert replaces the old row in one statement.
            relay.registry().set_binding(guild_id, target).await?;
            SetChannelOutcome::Moved { old, new: target }
        }
    };

    tracing::info!(guild_id = guild_id.0, ?outcome, "setchannel");
    Ok(outcome)
}

/// `/removechannel`: drop the guild's binding if one exists.
pub async fn remove_channel(
    relay: &Relay,
    access: Access,
    guild_id: Option<GuildId>,
) -> Result<RemoveChannelOutcome> {
    let Some(guild_id) = guild_id else {
        return Ok(RemoveChannelOutcome::GuildOnly);
    };
    if access == Access::Denied {
        return Ok(RemoveChannelOutcome::Denied);
    }

    let outcome = match relay.registry().get_binding(guild_id).await? {
        None => RemoveChannelOutcome::NothingToRemove,
        Some(current) => {
            relay.registry().clear_binding(guild_id).await?;
            RemoveChannelOutcome::Removed(current)
        }
    };

    tracing::info!(guild_id = guild_id.0, ?outcome, "removechannel");
    Ok(outcome)
}
