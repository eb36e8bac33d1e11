use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageRef},
    messaging::types::{ChatAction, MessagingCapabilities},
    Result,
};

/// Messenger port used by the relay listener.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Reply in-thread to `to`. `text` is already within `max_message_len`.
    async fn reply(&self, to: MessageRef, text: &str) -> Result<()>;

    async fn send_chat_action(&self, channel_id: ChannelId, action: ChatAction) -> Result<()>;
}
