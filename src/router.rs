//! Message router: commands first, then the stage engine for free text.

use std::sync::Arc;

use tracing::debug;

use crate::commands::{CommandDispatcher, DispatchReport};
use crate::message::InboundMessage;
use crate::stages::StageEngine;

/// How a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Empty body, nothing to do.
    Ignored,
    /// The command pass acted on the message; the stage engine was skipped.
    Command(DispatchReport),
    /// Conversational input, with the stage turn outcome.
    Stage(bool),
}

pub struct Router {
    commands: Arc<CommandDispatcher>,
    stages: Arc<StageEngine>,
}

impl Router {
    pub fn new(commands: Arc<CommandDispatcher>, stages: Arc<StageEngine>) -> Self {
        Self { commands, stages }
    }

    pub fn stages(&self) -> &Arc<StageEngine> {
        &self.stages
    }

    pub async fn route(&self, msg: &InboundMessage) -> Routed {
        if msg.body.trim().is_empty() {
            return Routed::Ignored;
        }

        debug!(
            user = %msg.user_id,
            channel = %msg.channel,
            name = msg.display_name(),
            "Routing message"
        );

        let report = self.commands.dispatch(msg).await;
        if report.is_handled() {
            return Routed::Command(report);
        }
        if report.is_match() {
            debug!(user = %msg.user_id, "Command skipped, passing to stages");
        }

        Routed::Stage(self.stages.process(msg).await)
    }
}
