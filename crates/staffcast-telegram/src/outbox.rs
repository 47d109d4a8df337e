//! The outbox: every outbound platform call funneled through the request
//! schedulers, plus the recipient-id fallback resolver.
//!
//! Upstream business data does not reliably tell a direct chat id from a
//! group-like one, so delivery is self-correcting: try the id as given,
//! then the `-100`-prefixed supergroup re-encoding, then the sign-inverted
//! form, in that fixed order.

use std::sync::Arc;

use staffcast_core::config::TelegramConfig;
use staffcast_core::{Result, StaffcastError};
use staffcast_scheduler::{Lane, RequestScheduler};

use crate::transport::Transport;
use crate::types::{OutgoingMessage, SentMessage};

/// The `-100`-prefixed supergroup re-encoding of a chat id, when the
/// concatenation still parses (it does not for ids that are already
/// negative). Preserved as observed platform behavior; do not reinterpret.
pub fn supergroup_variant(chat_id: i64) -> Option<i64> {
    format!("-100{chat_id}").parse().ok()
}

/// The fixed candidate order the resolver walks for one logical recipient.
pub fn candidate_chat_ids(chat_id: i64) -> Vec<i64> {
    let mut candidates = vec![chat_id];
    if let Some(variant) = supergroup_variant(chat_id) {
        candidates.push(variant);
    }
    candidates.push(-chat_id);
    candidates
}

/// Serialized send surface over one transport.
///
/// Message traffic rides the message scheduler (normal or low lane);
/// callback acknowledgments ride their own scheduler so a mailing burst
/// cannot delay button feedback.
pub struct Outbox {
    transport: Arc<dyn Transport>,
    messages: Arc<RequestScheduler>,
    callbacks: Arc<RequestScheduler>,
    config: TelegramConfig,
}

impl Outbox {
    pub fn new(
        transport: Arc<dyn Transport>,
        messages: Arc<RequestScheduler>,
        callbacks: Arc<RequestScheduler>,
        config: TelegramConfig,
    ) -> Self {
        Self {
            transport,
            messages,
            callbacks,
            config,
        }
    }

    async fn send_on(&self, lane: Lane, msg: OutgoingMessage) -> Result<SentMessage> {
        let transport = Arc::clone(&self.transport);
        self.messages
            .submit_and_wait(lane, move || async move {
                transport.send_message(&msg).await
            })
            .await
    }

    /// Send a message and wait for the platform's answer.
    pub async fn send(&self, msg: OutgoingMessage) -> Result<SentMessage> {
        self.send_on(Lane::Normal, msg).await
    }

    /// Send deferrable traffic on the low-priority lane.
    pub async fn send_low(&self, msg: OutgoingMessage) -> Result<SentMessage> {
        self.send_on(Lane::Low, msg).await
    }

    /// Retry a whole send up to `attempts` times, stopping at first success.
    /// No delay of its own; pacing comes from the scheduler pause.
    pub async fn send_repeat(&self, msg: OutgoingMessage, attempts: u32) -> Result<SentMessage> {
        self.repeat(attempts, || self.send(msg.clone())).await
    }

    /// Low-priority variant of [`send_repeat`](Self::send_repeat).
    pub async fn send_low_repeat(
        &self,
        msg: OutgoingMessage,
        attempts: u32,
    ) -> Result<SentMessage> {
        self.repeat(attempts, || self.send_low(msg.clone())).await
    }

    /// Deliver to a recipient whose chat-id encoding is uncertain.
    ///
    /// Walks [`candidate_chat_ids`] in order and returns the first success
    /// together with the id variant that worked; when every candidate fails
    /// the last error is wrapped in [`StaffcastError::DeliveryExhausted`].
    pub async fn send_with_chat_fallback(
        &self,
        msg: OutgoingMessage,
    ) -> Result<(i64, SentMessage)> {
        let original = msg.chat_id;
        let mut last_error: Option<StaffcastError> = None;

        for candidate in candidate_chat_ids(original) {
            let mut attempt = msg.clone();
            attempt.chat_id = candidate;
            match self.send(attempt).await {
                Ok(sent) => {
                    tracing::info!(
                        original,
                        resolved = candidate,
                        message_id = sent.message_id,
                        "delivery resolved"
                    );
                    return Ok((candidate, sent));
                }
                Err(e) => {
                    tracing::warn!(original, candidate, "delivery attempt failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(StaffcastError::DeliveryExhausted {
            recipient: original,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidates tried".into()),
        })
    }

    /// Retry the entire fallback chain up to `attempts` times.
    pub async fn send_with_chat_fallback_repeat(
        &self,
        msg: OutgoingMessage,
        attempts: u32,
    ) -> Result<(i64, SentMessage)> {
        self.repeat(attempts, || self.send_with_chat_fallback(msg.clone()))
            .await
    }

    pub async fn edit_message(&self, chat_id: i64, message_id: i64, text: String) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        self.messages
            .submit_and_wait(Lane::Normal, move || async move {
                transport.edit_message_text(chat_id, message_id, &text).await
            })
            .await
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        self.messages
            .submit_and_wait(Lane::Normal, move || async move {
                transport.delete_message(chat_id, message_id).await
            })
            .await
    }

    pub async fn pin_message(
        &self,
        chat_id: i64,
        message_id: i64,
        disable_notification: bool,
    ) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        self.messages
            .submit_and_wait(Lane::Normal, move || async move {
                transport
                    .pin_message(chat_id, message_id, disable_notification)
                    .await
            })
            .await
    }

    pub async fn unpin_all(&self, chat_id: i64) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        self.messages
            .submit_and_wait(Lane::Normal, move || async move {
                transport.unpin_all(chat_id).await
            })
            .await
    }

    pub async fn send_sticker(&self, chat_id: i64, file_id: String) -> Result<SentMessage> {
        let transport = Arc::clone(&self.transport);
        self.messages
            .submit_and_wait(Lane::Normal, move || async move {
                transport.send_sticker(chat_id, &file_id).await
            })
            .await
    }

    /// Plain acknowledgment of a button press.
    pub async fn answer_callback(&self, callback_id: String) -> Result<()> {
        self.answer(callback_id, String::new(), false).await
    }

    /// Pop-up alert the actor has to dismiss.
    pub async fn show_alert(&self, callback_id: String, text: String) -> Result<()> {
        self.answer(callback_id, text, true).await
    }

    async fn answer(&self, callback_id: String, text: String, show_alert: bool) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        self.callbacks
            .submit(Lane::Normal, move || async move {
                transport
                    .answer_callback(&callback_id, &text, show_alert)
                    .await
            })
            .await
    }

    /// Escalate to the operator chat's error topic, low priority with
    /// retries; the last resort for failures that need a human.
    pub async fn notify_ops(&self, text: String) -> Result<SentMessage> {
        let msg = OutgoingMessage::new(self.config.ops_chat_id, text)
            .in_topic(self.config.error_topic_id);
        self.send_low_repeat(msg, self.config.send_retries).await
    }

    async fn repeat<T, F, Fut>(&self, attempts: u32, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error: Option<StaffcastError> = None;
        for attempt in 0..attempts.max(1) {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::info!(attempt, "send attempt failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| StaffcastError::other("no send attempts made")))
    }
}
