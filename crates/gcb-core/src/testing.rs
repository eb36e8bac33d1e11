//! Hand-written fakes shared by the unit tests.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::Config,
    domain::{ChannelId, GuildId, MessageRef},
    errors::{Error, UpstreamError},
    formatting::MAX_MESSAGE_LEN,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, MessagingCapabilities},
    },
    model::{
        client::ChatModel,
        types::{GenerateRequest, GenerationConfig},
    },
    registry::ChannelRegistry,
    relay::Relay,
    session::UnboundedSessionCache,
    Result,
};

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        discord_bot_token: "discord".to_string(),
        gemini_api_key: "gemini".to_string(),
        command_prefix: "!".to_string(),
        dev_guild_id: None,
        pre_prompt: "Be concise".to_string(),
        gemini_model: "gemini-1.5-flash".to_string(),
        generation: GenerationConfig::default(),
        request_timeout: Duration::from_secs(1),
        database_path: ":memory:".into(),
    })
}

pub fn relay_with(registry: FakeRegistry, model: FakeModel) -> (Relay, Arc<FakeModel>) {
    let cfg = test_config();
    let model = Arc::new(model);
    let sessions = Arc::new(UnboundedSessionCache::new(
        model.clone(),
        cfg.generation.clone(),
    ));
    (Relay::new(cfg, Arc::new(registry), sessions), model)
}

pub struct FakeModel {
    reply: std::result::Result<String, UpstreamError>,
    calls: AtomicUsize,
    last: Mutex<Option<GenerateRequest>>,
}

impl FakeModel {
    pub fn replying(text: &str) -> Self {
        Self::with(Ok(text.to_string()))
    }

    pub fn failing(err: UpstreamError) -> Self {
        Self::with(Err(err))
    }

    fn with(reply: std::result::Result<String, UpstreamError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeModel {
    fn model_name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, req: GenerateRequest) -> std::result::Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(req);
        // Yield so concurrent callers actually interleave.
        tokio::task::yield_now().await;
        self.reply.clone()
    }
}

#[derive(Default)]
struct RegistryState {
    bindings: BTreeMap<GuildId, ChannelId>,
    reads: usize,
    writes: usize,
    deletes: usize,
}

/// In-memory registry with call counters. Clones share state.
#[derive(Clone, Default)]
pub struct FakeRegistry {
    state: Arc<Mutex<RegistryState>>,
    fail: bool,
}

impl FakeRegistry {
    pub fn with_binding(guild_id: GuildId, channel_id: ChannelId) -> Self {
        let reg = Self::default();
        reg.state.lock().unwrap().bindings.insert(guild_id, channel_id);
        reg
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn bindings(&self) -> Vec<(GuildId, ChannelId)> {
        let st = self.state.lock().unwrap();
        st.bindings.iter().map(|(g, c)| (*g, *c)).collect()
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().unwrap().deletes
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(Error::Storage("database is locked".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelRegistry for FakeRegistry {
    async fn set_binding(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.check()?;
        let mut st = self.state.lock().unwrap();
        st.writes += 1;
        st.bindings.insert(guild_id, channel_id);
        Ok(())
    }

    async fn clear_binding(&self, guild_id: GuildId) -> Result<()> {
        self.check()?;
        let mut st = self.state.lock().unwrap();
        st.deletes += 1;
        st.bindings.remove(&guild_id);
        Ok(())
    }

    async fn get_binding(&self, guild_id: GuildId) -> Result<Option<ChannelId>> {
        self.check()?;
        let mut st = self.state.lock().unwrap();
        st.reads += 1;
        Ok(st.bindings.get(&guild_id).copied())
    }
}

#[derive(Default)]
pub struct FakeMessenger {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    replies: Mutex<Vec<(MessageRef, String)>>,
    typing: AtomicUsize,
}

impl FakeMessenger {
    /// The next `n` replies fail with a messaging error.
    pub fn failing_replies(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    /// Replies that were delivered.
    pub fn replies(&self) -> Vec<(MessageRef, String)> {
        self.replies.lock().unwrap().clone()
    }

    /// Every reply attempt, delivered or not.
    pub fn reply_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn typing_calls(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    async fn reply(&self, to: MessageRef, text: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::Messaging("50035 Invalid Form Body".to_string()));
        }
        self.replies.lock().unwrap().push((to, text.to_string()));
        Ok(())
    }

    async fn send_chat_action(&self, _channel_id: ChannelId, _action: ChatAction) -> Result<()> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
