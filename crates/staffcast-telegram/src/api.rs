//! Telegram Bot API client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use staffcast_core::{Result, StaffcastError};

use crate::transport::Transport;
use crate::types::{ApiResponse, OutgoingMessage, SentMessage, Update, User};

/// Thin reqwest wrapper around the Bot API.
pub struct TelegramApi {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramApi {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| StaffcastError::Channel(format!("{method} failed: {e}")))?;

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| StaffcastError::Channel(format!("invalid {method} response: {e}")))?;

        if !parsed.ok {
            return Err(StaffcastError::Channel(format!(
                "{method} error: {}",
                parsed.description.unwrap_or_default()
            )));
        }
        parsed
            .result
            .ok_or_else(|| StaffcastError::Channel(format!("{method} returned no result")))
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    /// Identify the bot account; used as the startup connectivity check.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", serde_json::json!({})).await
    }
}

#[async_trait]
impl Transport for TelegramApi {
    async fn send_message(&self, msg: &OutgoingMessage) -> Result<SentMessage> {
        let body = serde_json::to_value(msg)
            .map_err(|e| StaffcastError::Channel(format!("encode sendMessage: {e}")))?;
        self.call("sendMessage", body).await
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                serde_json::json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "deleteMessage",
                serde_json::json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    async fn pin_message(
        &self,
        chat_id: i64,
        message_id: i64,
        disable_notification: bool,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "pinChatMessage",
                serde_json::json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "disable_notification": disable_notification,
                }),
            )
            .await?;
        Ok(())
    }

    async fn unpin_all(&self, chat_id: i64) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "unpinAllChatMessages",
                serde_json::json!({ "chat_id": chat_id }),
            )
            .await?;
        Ok(())
    }

    async fn send_sticker(&self, chat_id: i64, file_id: &str) -> Result<SentMessage> {
        self.call(
            "sendSticker",
            serde_json::json!({ "chat_id": chat_id, "sticker": file_id }),
        )
        .await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "answerCallbackQuery",
                serde_json::json!({
                    "callback_query_id": callback_id,
                    "text": text,
                    "show_alert": show_alert,
                }),
            )
            .await?;
        Ok(())
    }
}
