use std::sync::Arc;

use crate::{
    config::Config,
    domain::ChannelId,
    errors::UpstreamError,
    registry::ChannelRegistry,
    session::SessionCache,
};

/// Shared application state: configuration, channel registry and sessions.
///
/// Cheap to clone; handlers receive it by reference.
#[derive(Clone)]
pub struct Relay {
    cfg: Arc<Config>,
    registry: Arc<dyn ChannelRegistry>,
    sessions: Arc<dyn SessionCache>,
}

impl Relay {
    pub fn new(
        cfg: Arc<Config>,
        registry: Arc<dyn ChannelRegistry>,
        sessions: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            cfg,
            registry,
            sessions,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn registry(&self) -> &dyn ChannelRegistry {
        self.registry.as_ref()
    }

    pub fn sessions(&self) -> &dyn SessionCache {
        self.sessions.as_ref()
    }

    /// `System:{pre}. Prompt:{text}` for an explicit `/prompt`.
    pub fn compose_prompt(&self, text: &str) -> String {
        format!("System:{}. Prompt:{text}", self.cfg.pre_prompt)
    }

    /// `System:{pre}. Prompt:{name} Said: {content}` for a relayed message.
    pub fn compose_chat(&self, display_name: &str, content: &str) -> String {
        format!(
            "System:{}. Prompt:{display_name} Said: {content}",
            self.cfg.pre_prompt
        )
    }

    /// Get-or-create the channel's session and send one composed message.
    pub async fn ask(
        &self,
        channel_id: ChannelId,
        composed: &str,
    ) -> Result<String, UpstreamError> {
        let session = self.sessions.get_or_create(channel_id).await;
        session.send(composed).await
    }
}
