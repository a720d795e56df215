//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of inbound messages produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message received from a transport, before normalization.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel that produced the message.
    pub channel: String,
    /// Raw sender identity as reported by the transport.
    pub user_id: String,
    /// Display name of the sender, if known.
    pub user_name: Option<String>,
    pub content: String,
    /// Whether the message came from a group chat.
    pub is_group: bool,
    /// Whether the message carries (or quotes) downloadable media.
    pub has_media: bool,
    /// Transport-specific routing data (chat id, native message id, ...).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            user_name: None,
            content: content.to_string(),
            is_group: false,
            has_media: false,
            metadata: serde_json::json!({}),
            received_at: Utc::now(),
        }
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
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

    /// Chat identifier from metadata, falling back to the sender.
    pub fn chat_id(&self) -> &str {
        self.metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.user_id)
    }
}

/// A text reply sent back through a channel.
#[derive(Debug, Clone)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// A chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name (e.g. "cli", "telegram").
    fn name(&self) -> &str;

    /// Start listening and return the inbound message stream.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a text reply to the chat the message came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// React to a message with an emoji. An empty emoji clears the reaction.
    async fn react(&self, _msg: &IncomingMessage, _emoji: &str) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Mark a message as read.
    async fn mark_read(&self, _msg: &IncomingMessage) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
