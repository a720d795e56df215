//! `mode`: owner command flipping public/private mode.

use std::sync::Arc;

use async_trait::async_trait;

use crate::commands::registry::{CommandDefinition, CommandHandler};
use crate::config::BotMode;
use crate::error::ConfigError;
use crate::message::InboundMessage;

pub struct ModeCommand {
    mode: Arc<BotMode>,
}

impl ModeCommand {
    pub fn new(mode: Arc<BotMode>) -> Self {
        Self { mode }
    }

    /// Owner-only, prefix-required `mode` command.
    pub fn definition(mode: Arc<BotMode>) -> CommandDefinition {
        CommandDefinition::new("mode", Self::new(mode))
            .tag("owner")
            .with_prefix()
            .owner_only()
    }
}

#[async_trait]
impl CommandHandler for ModeCommand {
    async fn execute(&self, msg: &InboundMessage) -> bool {
        match self.mode.toggle() {
            Ok(public) => {
                tracing::info!(user = %msg.user_id, public, "Bot mode changed");
                msg.reply(if public {
                    "The bot is now in public mode."
                } else {
                    "The bot is now in private mode."
                })
                .await;
                true
            }
            Err(e) => {
                tracing::error!("Failed to persist bot mode: {e}");
                let reason = match &e {
                    ConfigError::EnvFile { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                msg.reply(&format!("Failed to update .env file: {reason}"))
                    .await;
                false
            }
        }
    }
}
