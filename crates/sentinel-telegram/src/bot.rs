use reqwest::Client;
use sentinel_core::error::{Result, SentinelError};

use crate::types::*;

const MAX_MESSAGE_LENGTH: usize = 4096;

/// Thin client over the Telegram Bot API: message delivery plus the
/// moderation endpoints the bot schedules against. Holds one shared
/// connection-pooled HTTP client.
pub struct TelegramBot {
    client: Client,
    base_url: String,
}

impl TelegramBot {
    pub fn new(client: Client, token: &str) -> Self {
        let base_url = format!("https://api.telegram.org/bot{token}");
        Self { client, base_url }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{method}", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SentinelError::Telegram(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SentinelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let telegram_response: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| SentinelError::Telegram(e.to_string()))?;

        if !telegram_response.ok {
            return Err(SentinelError::Telegram(
                telegram_response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        telegram_response
            .result
            .ok_or_else(|| SentinelError::Telegram("missing result in response".to_string()))
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", serde_json::json!({})).await
    }

    pub async fn get_updates(&self, offset: i64, timeout: u32) -> Result<Vec<Update>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout,
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", body).await
    }

    /// Send a message, chunking at the Telegram length limit.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text) {
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            let _: serde_json::Value = self.call("sendMessage", body).await?;
        }
        Ok(())
    }

    /// Send a message and return the message_id (for later deletion).
    pub async fn send_message_with_id(&self, chat_id: i64, text: &str) -> Result<i64> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let result: serde_json::Value = self.call("sendMessage", body).await?;
        result["message_id"]
            .as_i64()
            .ok_or_else(|| SentinelError::Telegram("missing message_id in response".to_string()))
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });
        let _: serde_json::Value = self.call("deleteMessage", body).await?;
        Ok(())
    }

    pub async fn send_typing(&self, chat_id: i64) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "action": "typing",
        });
        let _: serde_json::Value = self.call("sendChatAction", body).await?;
        Ok(())
    }

    /// React to a message with a single emoji (e.g. a ✅ confirmation).
    pub async fn set_message_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reaction": [{"type": "emoji", "emoji": emoji}],
        });
        let _: serde_json::Value = self.call("setMessageReaction", body).await?;
        Ok(())
    }

    pub async fn ban_chat_member(&self, chat_id: i64, user_id: i64) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "user_id": user_id,
        });
        let _: serde_json::Value = self.call("banChatMember", body).await?;
        Ok(())
    }

    pub async fn unban_chat_member(&self, chat_id: i64, user_id: i64) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "user_id": user_id,
            "only_if_banned": true,
        });
        let _: serde_json::Value = self.call("unbanChatMember", body).await?;
        Ok(())
    }

    /// Mute or unmute a member. `until` is a unix timestamp; 0 means the
    /// restriction change is permanent until reversed.
    pub async fn restrict_chat_member(
        &self,
        chat_id: i64,
        user_id: i64,
        can_send: bool,
        until: i64,
    ) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "user_id": user_id,
            "permissions": {
                "can_send_messages": can_send,
                "can_send_other_messages": can_send,
                "can_add_web_page_previews": can_send,
            },
            "until_date": until,
        });
        let _: serde_json::Value = self.call("restrictChatMember", body).await?;
        Ok(())
    }
}

fn split_message(text: &str) -> Vec<String> {
    if text.len() <= MAX_MESSAGE_LENGTH {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= MAX_MESSAGE_LENGTH {
            chunks.push(remaining.to_string());
            break;
        }

        let split_at = &remaining[..MAX_MESSAGE_LENGTH];

        let split_pos = match split_at.rfind('\n') {
            Some(pos) => pos + 1,
            None => MAX_MESSAGE_LENGTH,
        };

        chunks.push(remaining[..split_pos].to_string());
        remaining = &remaining[split_pos..];
    }

    chunks
}
