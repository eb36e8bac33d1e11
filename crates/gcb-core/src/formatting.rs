//! Presentation: framework-agnostic rich cards plus message chunking.

use std::time::Duration;

use crate::domain::ChannelId;

/// Discord's "light embed" grey.
pub const COLOR_NEUTRAL: u32 = 0xEEEFF1;
pub const COLOR_ERROR: u32 = 0xE74C3C;

/// Discord hard limits.
pub const MAX_MESSAGE_LEN: usize = 2000;
pub const MAX_EMBED_DESCRIPTION_LEN: usize = 4096;

const SUPPORT_SERVER_URL: &str = "https://discord.gg/4uFYtfpnfP";

pub const PERMISSION_DENIED: &str = "You do not have the permission to use that command.";
pub const GUILD_ONLY: &str = "This command can only be used inside a server.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A structured rich message (title, description, color, fields, footer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<CardField>,
    pub footer: Option<String>,
}

impl Card {
    pub fn new(color: u32) -> Self {
        Self {
            title: None,
            description: None,
            color,
            fields: Vec::new(),
            footer: None,
        }
    }

    pub fn neutral() -> Self {
        Self::new(COLOR_NEUTRAL)
    }

    pub fn error() -> Self {
        Self::new(COLOR_ERROR)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description, truncated to the embed limit.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = Some(truncate_chars(&description, MAX_EMBED_DESCRIPTION_LEN));
        self
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(CardField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

pub fn ping_card(latency: Duration) -> Card {
    let ms = latency.as_secs_f64() * 1000.0;
    Card::neutral().description(format!("Pong! {ms:.2} ms"))
}

pub fn generating_card() -> Card {
    Card::neutral().title("Generating...")
}

pub fn prompt_card(prompt: &str, response: &str) -> Card {
    Card::neutral()
        .title("GeminiAPI")
        .description(format!("**PROMPT**\n{prompt}\n\n**RESPONSE**\n{response}"))
}

/// Error summary shared by `/prompt` and the relay listener.
pub fn generation_failure(input: &str, fault: &dyn std::fmt::Display) -> String {
    format!("Failed to generate a response for the prompt: `{input}`. Error: {fault}")
}

pub fn prompt_failure_card(prompt: &str, fault: &dyn std::fmt::Display) -> Card {
    Card::error()
        .title("Error: Failed to generate response")
        .description(generation_failure(prompt, fault))
}

pub fn notice_card(text: impl Into<String>) -> Card {
    Card::neutral().description(text)
}

pub fn channel_set(channel: ChannelId) -> String {
    format!("Channel {} set for the chatbot.", channel.mention())
}

pub fn channel_already_set(channel: ChannelId) -> String {
    format!(
        "The channel {} is already set for the chatbot.",
        channel.mention()
    )
}

pub fn channel_moved(old: ChannelId, new: ChannelId) -> String {
    format!(
        "The old channel was {}. Now set to {} for the chatbot.",
        old.mention(),
        new.mention()
    )
}

pub fn help_card() -> Card {
    Card::neutral()
        .title("Help")
        .field(
            "LINKS AND URLS",
            format!(
                "[Youtube Tutorial](https://www.youtube.com/)\n\
                 [Official Discord Server]({SUPPORT_SERVER_URL})\n\
                 [GeminiAPI Documentation](https://ai.google.dev/gemini-api/docs)\n\
                 [Poise Documentation](https://docs.rs/poise)"
            ),
            true,
        )
        .field(
            "HELP COMMANDS",
            "**/help**\nShows the list of all commands with useful links and urls.\n\
             **/ping**\nShows the current latency of the bot in ms.\n\
             **/prompt**\nSend a prompt to the AI and get an embedded response, \
             works in any channel.\n\
             **/setchannel**\nSets the channel used for live Ai chat in a server.\n\
             **/removechannel**\nRemoves the channel set for live Ai chat in a server \
             from the database.",
            false,
        )
        .footer(format!(
            "Still need help? Join our official Discord server at {SUPPORT_SERVER_URL}"
        ))
}

/// Presence text: "{n} Servers", or "{n} Server!" for zero or one.
pub fn presence_label(guild_count: usize) -> String {
    if guild_count > 1 {
        format!("{guild_count} Servers")
    } else {
        format!("{guild_count} Server!")
    }
}

/// Truncate to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out = s.chars().take(keep).collect::<String>();
    out.push_str("...");
    out
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Splits on line boundaries where possible; a single line longer than the
/// limit is hard-split.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len <= max_chars {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= max_chars {
            current.push_str(line);
            current_len = line_len;
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(max_chars) {
            if piece.len() == max_chars {
                chunks.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
