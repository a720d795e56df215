//! Command dispatcher: ordered matching with access policy and ack reactions.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info};

use crate::commands::registry::{CommandDefinition, CommandRegistry};
use crate::config::BotMode;
use crate::message::InboundMessage;

/// Reaction shown while an acknowledged command runs.
pub const PENDING_REACTION: &str = "⏳";
/// Reaction left when an acknowledged command fails.
pub const FAILED_REACTION: &str = "❌";

/// Denial replies for failed command predicates.
#[derive(Debug, Clone)]
pub struct CommandReplies {
    pub owner_only: String,
    pub query_required: String,
    pub group_only: String,
    pub private_only: String,
    pub media_required: String,
}

impl Default for CommandReplies {
    fn default() -> Self {
        Self {
            owner_only: "This command is for owners only".into(),
            query_required: "Query Required".into(),
            group_only: "Commands only work in Group Chat".into(),
            private_only: "Commands only work in Private Chat".into(),
            media_required: "Reply to Media Message, or send Media with Command".into(),
        }
    }
}

/// What one dispatch pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Commands whose name pattern matched the token.
    pub matched: usize,
    /// Commands whose handler ran.
    pub executed: usize,
    /// Commands refused by a predicate, each answered with a denial.
    pub denied: usize,
    /// The pass stopped at the public-mode gate.
    pub aborted: bool,
}

impl DispatchReport {
    pub fn is_match(&self) -> bool {
        self.matched > 0
    }

    /// Whether the pass acted on the message: ran a command, sent a denial
    /// or dropped it at the public-mode gate.
    pub fn is_handled(&self) -> bool {
        self.executed > 0 || self.denied > 0 || self.aborted
    }
}

pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    prefix: Regex,
    mode: Arc<BotMode>,
    replies: CommandReplies,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>, prefix: Regex, mode: Arc<BotMode>) -> Self {
        Self {
            registry,
            prefix,
            mode,
            replies: CommandReplies::default(),
        }
    }

    pub fn with_replies(mut self, replies: CommandReplies) -> Self {
        self.replies = replies;
        self
    }

    /// Longest prefix-pattern match within `token`, or "".
    pub fn extract_prefix<'a>(&self, token: &'a str) -> &'a str {
        self.prefix
            .find_iter(token)
            .map(|m| m.as_str())
            .max_by_key(|m| m.len())
            .unwrap_or("")
    }

    pub async fn dispatch(&self, msg: &InboundMessage) -> DispatchReport {
        let mut report = DispatchReport::default();

        let token = msg.command.as_str();
        let prefix = self.extract_prefix(token);
        let stripped = if prefix.is_empty() {
            token.to_string()
        } else {
            token.replace(prefix, "")
        };
        let has_prefix = !prefix.is_empty() && token.starts_with(prefix);

        for command in self.registry.iter() {
            let def = &command.definition;
            def.handler.before(msg).await;

            if !command.matches(&stripped) {
                continue;
            }
            report.matched += 1;

            if !self.mode.is_public() && !msg.is_owner {
                debug!(user = %msg.user_id, command = %def.name, "Private mode, dropping command");
                report.aborted = true;
                return report;
            }

            if def.requires_prefix != has_prefix {
                continue;
            }

            if let Some(denial) = self.denial(def, msg) {
                debug!(user = %msg.user_id, command = %def.name, "Command predicate failed");
                msg.reply(denial).await;
                report.denied += 1;
                continue;
            }

            info!(user = %msg.user_id, command = %def.name, "Executing command");
            if def.awaits_ack {
                msg.react(PENDING_REACTION).await;
            }

            let ok = def.handler.execute(msg).await;
            report.executed += 1;

            if def.awaits_ack {
                if ok {
                    msg.mark_read().await;
                    msg.react("").await;
                    return report;
                }
                msg.react(FAILED_REACTION).await;
            }
        }

        report
    }

    fn denial(&self, def: &CommandDefinition, msg: &InboundMessage) -> Option<&str> {
        if def.requires_owner && !msg.is_owner {
            Some(self.replies.owner_only.as_str())
        } else if def.requires_query && msg.text.is_empty() {
            Some(self.replies.query_required.as_str())
        } else if def.requires_group && !msg.is_group {
            Some(self.replies.group_only.as_str())
        } else if def.requires_private && msg.is_group {
            Some(self.replies.private_only.as_str())
        } else if def.requires_media && !msg.has_media {
            Some(self.replies.media_required.as_str())
        } else {
            None
        }
    }
}
