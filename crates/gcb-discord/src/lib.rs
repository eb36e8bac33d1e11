//! Discord adapter (poise + serenity).
//!
//! This crate implements the `gcb-core` MessagingPort over the Discord HTTP
//! API and exposes the bot commands and gateway event handling.

use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

pub mod handlers;
pub mod router;

use gcb_core::{
    domain::{ChannelId, MessageRef},
    errors::Error,
    formatting::{Card, MAX_MESSAGE_LEN},
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<serenity::Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    fn dc_channel(channel_id: ChannelId) -> serenity::ChannelId {
        serenity::ChannelId::new(channel_id.0)
    }

    fn map_err(e: serenity::Error) -> Error {
        Error::Messaging(format!("discord error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for DiscordMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    async fn reply(&self, to: MessageRef, text: &str) -> Result<()> {
        let channel = Self::dc_channel(to.channel_id);
        let builder = serenity::CreateMessage::new()
            .content(text)
            .reference_message((channel, serenity::MessageId::new(to.message_id.0)))
            .allowed_mentions(serenity::CreateAllowedMentions::new().replied_user(true));

        channel
            .send_message(self.http.as_ref(), builder)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn send_chat_action(&self, channel_id: ChannelId, action: ChatAction) -> Result<()> {
        match action {
            ChatAction::Typing => Self::dc_channel(channel_id)
                .broadcast_typing(self.http.as_ref())
                .await
                .map_err(Self::map_err),
        }
    }
}

/// Render a core card as a Discord embed.
pub fn embed(card: &Card) -> serenity::CreateEmbed {
    let mut e = serenity::CreateEmbed::new().color(card.color);
    if let Some(title) = &card.title {
        e = e.title(title);
    }
    if let Some(description) = &card.description {
        e = e.description(description);
    }
    for f in &card.fields {
        e = e.field(&f.name, &f.value, f.inline);
    }
    if let Some(footer) = &card.footer {
        e = e.footer(serenity::CreateEmbedFooter::new(footer));
    }
    e
}

/// A reply consisting of a single embed.
pub fn card_reply(card: &Card) -> poise::CreateReply {
    poise::CreateReply::default().embed(embed(card))
}
