//! Telegram channel: long-polls the Bot API for updates.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Message fields that carry downloadable media.
const MEDIA_FIELDS: &[&str] = &[
    "photo",
    "document",
    "video",
    "audio",
    "voice",
    "sticker",
    "animation",
    "video_note",
];

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Send a text message, trying Markdown first with plain text fallback.
    /// Splits long messages that exceed Telegram's 4096 char limit.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            self.send_message_chunk(chat_id, &chunk).await?;
        }
        Ok(())
    }

    /// Send a single message chunk, Markdown-first with fallback.
    async fn send_message_chunk(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(send_failed)?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(send_failed)?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }

    async fn poll_updates(client: &reqwest::Client, url: &str, offset: i64) -> anyhow::Result<Value> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": 30,
            "allowed_updates": ["message"]
        });
        let resp = client.post(url).json(&body).send().await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let data = match Self::poll_updates(&client, &url, offset).await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    continue;
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.send_message(msg.chat_id(), &response.content).await
    }

    async fn react(&self, msg: &IncomingMessage, emoji: &str) -> Result<(), ChannelError> {
        let Some(message_id) = msg.metadata.get("message_id").and_then(Value::as_i64) else {
            return Ok(());
        };

        let resp = self
            .client
            .post(self.api_url("setMessageReaction"))
            .json(&reaction_body(msg.chat_id(), message_id, emoji))
            .send()
            .await
            .map_err(send_failed)?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("setMessageReaction failed: {err}"),
            });
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(token: &SecretString, method: &str) -> String {
    format!(
        "https://api.telegram.org/bot{}/{method}",
        token.expose_secret()
    )
}

fn send_failed(e: reqwest::Error) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason: e.without_url().to_string(),
    }
}

fn has_media(message: &Value) -> bool {
    MEDIA_FIELDS.iter().any(|f| message.get(f).is_some())
}

/// Convert one `getUpdates` entry into an `IncomingMessage`.
///
/// Updates without a message, or whose message has neither text nor a
/// caption, are skipped.
fn parse_update(update: &Value) -> Option<IncomingMessage> {
    let message = update.get("message")?;
    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(Value::as_str)?;

    let from = message.get("from");
    let username = from
        .and_then(|f| f.get("username"))
        .and_then(Value::as_str);
    let sender = from
        .and_then(|f| f.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .or_else(|| username.map(String::from))?;

    let chat = message.get("chat");
    let chat_id = chat
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_else(|| sender.clone());
    let is_group = matches!(
        chat.and_then(|c| c.get("type")).and_then(Value::as_str),
        Some("group" | "supergroup")
    );

    let quoted = message.get("reply_to_message");
    let media = has_media(message) || quoted.is_some_and(has_media);

    let mut incoming = IncomingMessage::new("telegram", &sender, text)
        .in_group(is_group)
        .with_media(media)
        .with_metadata(serde_json::json!({
            "chat_id": chat_id,
            "message_id": message.get("message_id").and_then(Value::as_i64),
            "username": username,
        }));

    let display = from
        .and_then(|f| f.get("first_name"))
        .and_then(Value::as_str)
        .or(username);
    if let Some(name) = display {
        incoming = incoming.with_user_name(name);
    }

    Some(incoming)
}

/// Telegram accepts only a fixed reaction set; map ack emojis onto it.
fn telegram_reaction(emoji: &str) -> &str {
    match emoji {
        "⏳" => "👀",
        "❌" => "👎",
        other => other,
    }
}

fn reaction_body(chat_id: &str, message_id: i64, emoji: &str) -> Value {
    let reaction = if emoji.is_empty() {
        serde_json::json!([])
    } else {
        serde_json::json!([{ "type": "emoji", "emoji": telegram_reaction(emoji) }])
    };
    serde_json::json!({
        "chat_id": chat_id,
        "message_id": message_id,
        "reaction": reaction,
    })
}

/// Split a message into chunks of at most `max_len` bytes.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(token: &str) -> TelegramChannel {
        TelegramChannel::new(SecretString::from(token.to_string()))
    }

    #[test]
    fn telegram_channel_name() {
        assert_eq!(channel("fake-token").name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            channel("123:ABC").api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    // ── Update parsing ──────────────────────────────────────────────

    #[test]
    fn parses_private_text_message() {
        let update = serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 77,
                "from": {"id": 5511999, "first_name": "Ana", "username": "ana"},
                "chat": {"id": 5511999, "type": "private"},
                "text": "1"
            }
        });
        let msg = parse_update(&update).unwrap();
        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.user_id, "5511999");
        assert_eq!(msg.user_name.as_deref(), Some("Ana"));
        assert_eq!(msg.content, "1");
        assert_eq!(msg.chat_id(), "5511999");
        assert_eq!(msg.metadata["message_id"], 77);
        assert!(!msg.is_group);
        assert!(!msg.has_media);
    }

    #[test]
    fn parses_group_caption_with_media() {
        let update = serde_json::json!({
            "update_id": 11,
            "message": {
                "message_id": 78,
                "from": {"id": 42, "username": "bob"},
                "chat": {"id": -100123, "type": "supergroup"},
                "photo": [{"file_id": "x"}],
                "caption": "/sticker"
            }
        });
        let msg = parse_update(&update).unwrap();
        assert!(msg.is_group);
        assert!(msg.has_media);
        assert_eq!(msg.chat_id(), "-100123");
        assert_eq!(msg.user_name.as_deref(), Some("bob"));
    }

    #[test]
    fn quoted_media_counts_as_media() {
        let update = serde_json::json!({
            "message": {
                "from": {"id": 42},
                "chat": {"id": 42, "type": "private"},
                "text": "/sticker",
                "reply_to_message": {"document": {"file_id": "y"}}
            }
        });
        let msg = parse_update(&update).unwrap();
        assert!(msg.has_media);
    }

    #[test]
    fn skips_updates_without_text() {
        assert!(parse_update(&serde_json::json!({"update_id": 1})).is_none());
        let sticker_only = serde_json::json!({
            "message": {"from": {"id": 1}, "chat": {"id": 1}, "sticker": {}}
        });
        assert!(parse_update(&sticker_only).is_none());
    }

    // ── Reactions ───────────────────────────────────────────────────

    #[test]
    fn reaction_body_maps_ack_emojis() {
        let body = reaction_body("42", 7, "⏳");
        assert_eq!(body["reaction"][0]["emoji"], "👀");
        assert_eq!(body["message_id"], 7);

        let body = reaction_body("42", 7, "🔥");
        assert_eq!(body["reaction"][0]["emoji"], "🔥");
    }

    #[test]
    fn empty_reaction_clears() {
        let body = reaction_body("42", 7, "");
        assert_eq!(body["reaction"], serde_json::json!([]));
    }

    // ── Message splitting tests ─────────────────────────────────────

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks, vec!["a".repeat(2000), "b".repeat(3000)]);
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn split_message_respects_char_boundaries() {
        // "é" is two bytes; a 5-byte limit falls inside the third one.
        let msg = "éééééé";
        let chunks = split_message(msg, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), msg);
    }
}
