use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::ChannelId,
    errors::UpstreamError,
    model::{
        client::ChatModel,
        types::{ChatTurn, GenerateRequest, GenerationConfig},
    },
};

/// One multi-turn exchange with the model, tied to a single channel.
///
/// History only grows on successful turns. Sends are serialized on the
/// history lock so two turns on the same channel never interleave.
pub struct ConversationSession {
    channel_id: ChannelId,
    model: Arc<dyn ChatModel>,
    config: GenerationConfig,
    history: Mutex<Vec<ChatTurn>>,
}

impl ConversationSession {
    pub fn new(channel_id: ChannelId, model: Arc<dyn ChatModel>, config: GenerationConfig) -> Self {
        Self {
            channel_id,
            model,
            config,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Send one composed message and append the exchange to the history.
    pub async fn send(&self, message: &str) -> Result<String, UpstreamError> {
        let mut history = self.history.lock().await;

        let mut contents = history.clone();
        contents.push(ChatTurn::user(message));

        let reply = self
            .model
            .generate(GenerateRequest {
                contents,
                config: self.config.clone(),
            })
            .await?;

        history.push(ChatTurn::user(message));
        history.push(ChatTurn::model(reply.clone()));
        Ok(reply)
    }

    pub async fn history(&self) -> Vec<ChatTurn> {
        self.history.lock().await.clone()
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("channel_id", &self.channel_id)
            .field("model", &self.model.model_name())
            .finish_non_exhaustive()
    }
}

/// Channel → session mapping.
///
/// `get_or_create` must be insert-if-absent: concurrent first use of a
/// channel yields one canonical session.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get_or_create(&self, channel_id: ChannelId) -> Arc<ConversationSession>;

    async fn len(&self) -> usize;
}

/// Session cache without eviction: sessions live until the process exits.
pub struct UnboundedSessionCache {
    model: Arc<dyn ChatModel>,
    config: GenerationConfig,
    inner: Mutex<HashMap<ChannelId, Arc<ConversationSession>>>,
}

impl UnboundedSessionCache {
    pub fn new(model: Arc<dyn ChatModel>, config: GenerationConfig) -> Self {
        Self {
            model,
            config,
            inner: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionCache for UnboundedSessionCache {
    async fn get_or_create(&self, channel_id: ChannelId) -> Arc<ConversationSession> {
        let mut map = self.inner.lock().await;
        map.entry(channel_id)
            .or_insert_with(|| {
                tracing::debug!(channel_id = channel_id.0, "creating conversation session");
                Arc::new(ConversationSession::new(
                    channel_id,
                    self.model.clone(),
                    self.config.clone(),
                ))
            })
            .clone()
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
