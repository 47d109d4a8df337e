//! The transport seam between the outbox and the Bot API.

use async_trait::async_trait;
use staffcast_core::Result;

use crate::types::{OutgoingMessage, SentMessage};

/// Everything the rest of the system is allowed to ask of the messaging
/// platform. The production impl is [`TelegramApi`](crate::api::TelegramApi);
/// tests substitute programmable fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, msg: &OutgoingMessage) -> Result<SentMessage>;

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    async fn pin_message(
        &self,
        chat_id: i64,
        message_id: i64,
        disable_notification: bool,
    ) -> Result<()>;

    async fn unpin_all(&self, chat_id: i64) -> Result<()>;

    async fn send_sticker(&self, chat_id: i64, file_id: &str) -> Result<SentMessage>;

    /// Acknowledge a button press; with `show_alert` the text pops up as a
    /// dismissable alert instead of a toast.
    async fn answer_callback(&self, callback_id: &str, text: &str, show_alert: bool)
    -> Result<()>;
}
