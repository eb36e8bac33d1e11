use std::sync::Arc;

use anyhow::Context as _;
use tracing::error;

use gcb_core::{config::Config, relay::Relay, session::UnboundedSessionCache};
use gcb_gemini::GeminiClient;
use gcb_store::SqliteChannelRegistry;

#[tokio::main]
async fn main() {
    if let Err(e) = gcb_core::logging::init("gcb") {
        eprintln!("{e}");
    }

    if let Err(e) = run().await {
        error!("An error occurred while starting the bot: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = Arc::new(Config::load()?);

    let registry = Arc::new(
        SqliteChannelRegistry::open(&cfg.database_path)
            .await
            .context("failed to open channel registry")?,
    );

    let model = Arc::new(GeminiClient::new(
        cfg.gemini_api_key.clone(),
        cfg.gemini_model.clone(),
        cfg.request_timeout,
    )?);
    let sessions = Arc::new(UnboundedSessionCache::new(model, cfg.generation.clone()));

    let relay = Relay::new(cfg.clone(), registry.clone(), sessions);

    let result = gcb_discord::router::run(cfg, relay).await;
    registry.close().await;
    result.context("discord bot failed")
}
