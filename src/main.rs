use std::sync::Arc;

use futures::StreamExt;
use secrecy::SecretString;

use stage_bot::channels::cli::DEFAULT_CLI_USER;
use stage_bot::channels::{ChannelManager, ChannelResponder, CliChannel, TelegramChannel};
use stage_bot::commands::{self, CommandDispatcher, CommandRegistry};
use stage_bot::config::{BotConfig, BotMode, EnvFile};
use stage_bot::message::InboundMessage;
use stage_bot::router::{Routed, Router};
use stage_bot::stages::{self, StageEngine, UserStageStore};
use stage_bot::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("🤖 Stage Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Mode: {}",
        if config.public { "public" } else { "private" }
    );
    eprintln!(
        "   Owners: {}",
        if config.owners.is_empty() {
            "none".to_string()
        } else {
            config.owners.entries().join(", ")
        }
    );

    let db_path = config.db_path();
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&db_path).await.unwrap_or_else(
        |e| {
            eprintln!("Error: failed to open database at {}: {e}", db_path.display());
            std::process::exit(1);
        },
    ));
    eprintln!("   Database: {}", db_path.display());

    let registry = stages::builtin::registry();
    for (from, to) in registry.dangling_targets() {
        tracing::warn!(from = %from, to = %to, "Stage lists an unregistered next stage");
    }
    eprintln!("   Stages: {}", registry.len());
    let registry = Arc::new(registry);

    let store = Arc::new(UserStageStore::new(
        Arc::clone(&db),
        Arc::clone(&registry),
        config.owners.clone(),
    ));
    let engine = Arc::new(
        StageEngine::new(store, config.authorized_users.clone())
            .with_max_chain_depth(config.max_chain_depth),
    );

    let mode = Arc::new(BotMode::new(config.public, EnvFile::new(&config.env_file)));
    let command_registry = CommandRegistry::from_definitions(commands::builtin(Arc::clone(&mode)))?;
    eprintln!("   Commands: {}", command_registry.len());
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::new(command_registry),
        config.prefix.clone(),
        mode,
    ));

    let router = Arc::new(Router::new(dispatcher, engine));

    // Set up channels
    let mut channels = ChannelManager::new();

    // The local REPL speaks as the first owner so owner commands work out of the box.
    let cli_user = config
        .owners
        .entries()
        .iter()
        .find(|o| o.as_str() != "*")
        .cloned()
        .unwrap_or_else(|| DEFAULT_CLI_USER.to_string());
    channels.add(Box::new(CliChannel::new(cli_user)));

    if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
        channels.add(Box::new(TelegramChannel::new(SecretString::from(token))));
    }

    eprintln!("   Channels: {}\n", channels.names().join(", "));

    let channels = Arc::new(channels);
    let mut stream = channels.start_all().await?;
    let owners = config.owners.clone();

    loop {
        let incoming = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down...");
                break;
            }
            msg = stream.next() => {
                match msg {
                    Some(m) => m,
                    None => {
                        tracing::info!("All channel streams ended, shutting down...");
                        break;
                    }
                }
            }
        };

        let router = Arc::clone(&router);
        let channels = Arc::clone(&channels);
        let owners = owners.clone();
        tokio::spawn(async move {
            let responder = ChannelResponder::new(channels, incoming.clone());
            let msg = InboundMessage::from_incoming(&incoming, &owners, Arc::new(responder));
            match router.route(&msg).await {
                Routed::Ignored => {}
                Routed::Command(report) => {
                    tracing::debug!(user = %msg.user_id, executed = report.executed, "Command pass finished")
                }
                Routed::Stage(handled) => {
                    tracing::debug!(user = %msg.user_id, handled, "Stage turn finished")
                }
            }
        });
    }

    channels.shutdown_all().await;
    Ok(())
}
