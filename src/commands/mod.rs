//! Prefix-triggered, permission-gated commands.

pub mod dispatcher;
pub mod mode;
pub mod registry;

use std::sync::Arc;

pub use dispatcher::{CommandDispatcher, CommandReplies, DispatchReport};
pub use mode::ModeCommand;
pub use registry::{CommandDefinition, CommandHandler, CommandRegistry, RegisteredCommand};

use crate::config::BotMode;

/// Commands the binary registers, in dispatch order.
pub fn builtin(mode: Arc<BotMode>) -> Vec<CommandDefinition> {
    vec![ModeCommand::definition(mode)]
}
