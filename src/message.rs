//! Normalized inbound message shared by both dispatchers.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::IncomingMessage;
use crate::config::AllowList;
use crate::error::ChannelError;

/// Side-effecting callbacks bound to the message they answer.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, text: &str) -> Result<(), ChannelError>;

    /// An empty emoji clears the reaction.
    async fn react(&self, emoji: &str) -> Result<(), ChannelError>;

    async fn mark_read(&self) -> Result<(), ChannelError>;
}

/// Strip the server and device qualifiers from a sender identity.
///
/// `5511999:12@s.whatsapp.net` → `5511999`.
pub fn normalize_user_id(sender: &str) -> &str {
    let user = sender.split('@').next().unwrap_or(sender);
    user.split(':').next().unwrap_or(user)
}

/// Read-only snapshot of one inbound message.
#[derive(Clone)]
pub struct InboundMessage {
    pub id: String,
    pub channel: String,
    /// Raw sender identity.
    pub sender: String,
    /// Sender with device/server qualifiers removed.
    pub user_id: String,
    pub chat_id: String,
    pub push_name: Option<String>,
    /// Raw text body.
    pub body: String,
    /// First word of the body, lower-cased.
    pub command: String,
    /// Remaining words after the command token.
    pub args: Vec<String>,
    /// `args` joined by single spaces (the query argument).
    pub text: String,
    pub is_owner: bool,
    pub is_group: bool,
    pub has_media: bool,
    responder: Arc<dyn Responder>,
}

impl InboundMessage {
    pub fn new(channel: &str, sender: &str, body: &str, responder: Arc<dyn Responder>) -> Self {
        let mut words = body.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let args: Vec<String> = words.map(String::from).collect();
        let text = args.join(" ");
        let user_id = normalize_user_id(sender).to_string();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.to_string(),
            sender: sender.to_string(),
            chat_id: user_id.clone(),
            user_id,
            push_name: None,
            body: body.to_string(),
            command,
            args,
            text,
            is_owner: false,
            is_group: false,
            has_media: false,
            responder,
        }
    }

    /// Normalize a transport message, resolving the owner flag against `owners`.
    pub fn from_incoming(
        incoming: &IncomingMessage,
        owners: &AllowList,
        responder: Arc<dyn Responder>,
    ) -> Self {
        let mut msg = Self::new(
            &incoming.channel,
            &incoming.user_id,
            &incoming.content,
            responder,
        );
        msg.id = incoming.id.to_string();
        msg.chat_id = incoming.chat_id().to_string();
        msg.push_name = incoming.user_name.clone();
        msg.is_owner = owners.contains(&msg.user_id);
        msg.is_group = incoming.is_group;
        msg.has_media = incoming.has_media;
        msg
    }

    pub fn with_owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    pub fn in_group(mut self, is_group: bool) -> Self {
        self.is_group = is_group;
        self
    }

    pub fn with_media(mut self, has_media: bool) -> Self {
        self.has_media = has_media;
        self
    }

    pub fn with_push_name(mut self, name: &str) -> Self {
        self.push_name = Some(name.to_string());
        self
    }

    /// Body trimmed and lower-cased, the form stage handlers match on.
    pub fn normalized_text(&self) -> String {
        self.body.trim().to_lowercase()
    }

    /// Display name, falling back to the user id.
    pub fn display_name(&self) -> &str {
        self.push_name.as_deref().unwrap_or(&self.user_id)
    }

    /// Send a text reply. Transport failures are logged, not propagated.
    pub async fn reply(&self, text: &str) {
        if let Err(e) = self.responder.reply(text).await {
            tracing::warn!(user = %self.user_id, "Reply failed: {e}");
        }
    }

    pub async fn react(&self, emoji: &str) {
        if let Err(e) = self.responder.react(emoji).await {
            tracing::warn!(user = %self.user_id, emoji, "Reaction failed: {e}");
        }
    }

    pub async fn mark_read(&self) {
        if let Err(e) = self.responder.mark_read().await {
            tracing::warn!(user = %self.user_id, "Mark-read failed: {e}");
        }
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("user_id", &self.user_id)
            .field("body", &self.body)
            .field("command", &self.command)
            .field("is_owner", &self.is_owner)
            .field("is_group", &self.is_group)
            .field("has_media", &self.has_media)
            .finish_non_exhaustive()
    }
}
