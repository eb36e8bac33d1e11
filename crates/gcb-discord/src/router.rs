use std::sync::Arc;

use poise::serenity_prelude as serenity;
use tracing::{error, info};

use gcb_core::{config::Config, relay::Relay};

use crate::handlers;

/// Per-framework user data handed to every command and event.
pub struct Data {
    pub relay: Relay,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub fn intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
}

/// Connect to the gateway and run until shutdown.
pub async fn run(cfg: Arc<Config>, relay: Relay) -> anyhow::Result<()> {
    let dev_guild = cfg.dev_guild_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: handlers::commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(cfg.command_prefix.clone()),
                ..Default::default()
            },
            on_error: |err| Box::pin(on_error(err)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::handle_event(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                let commands = &framework.options().commands;
                poise::builtins::register_globally(ctx, commands).await?;
                if let Some(gid) = dev_guild {
                    poise::builtins::register_in_guild(ctx, commands, serenity::GuildId::new(gid))
                        .await?;
                    info!(guild_id = gid, "registered commands in development guild");
                }

                info!(
                    user = %ready.user.name,
                    guilds = ready.guilds.len(),
                    commands = commands.len(),
                    "logged in"
                );
                Ok(Data { relay })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&cfg.discord_bot_token, intents())
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await?;
    Ok(())
}

/// Command faults are logged only; the user sees whatever placeholder the
/// command already posted.
async fn on_error(err: poise::FrameworkError<'_, Data, Error>) {
    match err {
        poise::FrameworkError::Setup { error, .. } => {
            error!(error = %error, "framework setup failed");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                command = %ctx.command().qualified_name,
                error = %error,
                "command failed"
            );
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!(error = %e, "error while handling framework error");
            }
        }
    }
}
