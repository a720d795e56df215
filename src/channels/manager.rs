//! Channel manager: merges inbound streams and routes replies back to the
//! channel a message came from.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;
use crate::message::Responder;

/// Owns every active channel.
pub struct ChannelManager {
    channels: Vec<Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        tracing::debug!(channel = channel.name(), "Channel added");
        self.channels.push(channel);
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    fn get(&self, name: &str) -> Result<&dyn Channel, ChannelError> {
        self.channels
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
            .ok_or_else(|| ChannelError::UnknownChannel(name.to_string()))
    }

    /// Start all channels and merge their streams.
    ///
    /// A channel that fails to start is logged and skipped; the call only
    /// fails when no channel could be started.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            match channel.start().await {
                Ok(s) => {
                    tracing::info!(channel = channel.name(), "Channel started");
                    streams.push(s);
                }
                Err(e) => tracing::error!(channel = channel.name(), "Channel failed to start: {e}"),
            }
        }

        if streams.is_empty() {
            return Err(ChannelError::StartupFailed {
                name: "all".into(),
                reason: "no channel could be started".into(),
            });
        }

        Ok(Box::pin(stream::select_all(streams)))
    }

    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.get(&msg.channel)?.respond(msg, response).await
    }

    pub async fn react(&self, msg: &IncomingMessage, emoji: &str) -> Result<(), ChannelError> {
        self.get(&msg.channel)?.react(msg, emoji).await
    }

    pub async fn mark_read(&self, msg: &IncomingMessage) -> Result<(), ChannelError> {
        self.get(&msg.channel)?.mark_read(msg).await
    }

    /// Run health checks, returning the names of failing channels.
    pub async fn health_check_all(&self) -> Vec<String> {
        let mut failing = Vec::new();
        for channel in &self.channels {
            if let Err(e) = channel.health_check().await {
                tracing::warn!(channel = channel.name(), "Health check failed: {e}");
                failing.push(channel.name().to_string());
            }
        }
        failing
    }

    pub async fn shutdown_all(&self) {
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), "Shutdown failed: {e}");
            }
        }
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Reply/react/mark-read callbacks bound to one inbound message.
pub struct ChannelResponder {
    channels: Arc<ChannelManager>,
    message: IncomingMessage,
}

impl ChannelResponder {
    pub fn new(channels: Arc<ChannelManager>, message: IncomingMessage) -> Self {
        Self { channels, message }
    }
}

#[async_trait]
impl Responder for ChannelResponder {
    async fn reply(&self, text: &str) -> Result<(), ChannelError> {
        self.channels
            .respond(&self.message, OutgoingResponse::text(text))
            .await
    }

    async fn react(&self, emoji: &str) -> Result<(), ChannelError> {
        self.channels.react(&self.message, emoji).await
    }

    async fn mark_read(&self) -> Result<(), ChannelError> {
        self.channels.mark_read(&self.message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures::StreamExt;

    struct FakeChannel {
        name: &'static str,
        inbound: Vec<&'static str>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Channel for FakeChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let msgs: Vec<IncomingMessage> = self
                .inbound
                .iter()
                .map(|text| IncomingMessage::new(self.name, "u1", text))
                .collect();
            Ok(Box::pin(stream::iter(msgs)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, response.content));
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn manager_with(sent: &Arc<Mutex<Vec<String>>>) -> ChannelManager {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(FakeChannel {
            name: "a",
            inbound: vec!["one", "two"],
            sent: Arc::clone(sent),
        }));
        manager.add(Box::new(FakeChannel {
            name: "b",
            inbound: vec!["three"],
            sent: Arc::clone(sent),
        }));
        manager
    }

    #[tokio::test]
    async fn start_all_merges_streams() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let manager = manager_with(&sent);
        let stream = manager.start_all().await.unwrap();
        let mut contents: Vec<String> = stream.map(|m| m.content).collect().await;
        contents.sort();
        assert_eq!(contents, vec!["one", "three", "two"]);
    }

    #[tokio::test]
    async fn responder_routes_to_origin_channel() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let manager = Arc::new(manager_with(&sent));

        let responder = ChannelResponder::new(
            Arc::clone(&manager),
            IncomingMessage::new("b", "u1", "hello"),
        );
        responder.reply("hi").await.unwrap();
        // Default trait methods are no-ops.
        responder.react("⏳").await.unwrap();
        responder.mark_read().await.unwrap();

        assert_eq!(*sent.lock().unwrap(), vec!["b:hi".to_string()]);
    }

    #[tokio::test]
    async fn unknown_channel_is_an_error() {
        let manager = ChannelManager::new();
        let msg = IncomingMessage::new("ghost", "u1", "hello");
        let err = manager
            .respond(&msg, OutgoingResponse::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnknownChannel(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn start_all_fails_without_channels() {
        let manager = ChannelManager::new();
        assert!(manager.start_all().await.is_err());
    }
}
