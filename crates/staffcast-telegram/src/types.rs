//! Telegram Bot API wire types.

use serde::{Deserialize, Serialize};
use staffcast_core::types::{ActorRef, EventKind, IncomingEvent, TextEntity};

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub date: i64,
    #[serde(default)]
    pub entities: Vec<ApiEntity>,
}

/// The message a send resolves to.
pub type SentMessage = Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: u32,
    pub length: u32,
    pub url: Option<String>,
}

// --- Reply markup ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Reply(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

/// One outbound text message, built up before it enters the outbox.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            reply_to_message_id: None,
            message_thread_id: None,
            reply_markup: None,
        }
    }

    pub fn html(mut self) -> Self {
        self.parse_mode = Some("HTML".into());
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    /// Address a forum topic inside a chat.
    pub fn in_topic(mut self, topic_id: i64) -> Self {
        if topic_id != 0 {
            self.message_thread_id = Some(topic_id);
        }
        self
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

impl Update {
    /// Normalize a raw update into an inbound event, or `None` for update
    /// kinds the dialog engine does not consume (bot senders included).
    pub fn to_event(&self) -> Option<IncomingEvent> {
        if let Some(msg) = &self.message {
            let from = msg.from.as_ref()?;
            let text = msg.text.as_ref()?;
            if from.is_bot {
                return None;
            }
            return Some(IncomingEvent {
                actor: actor_ref(from),
                chat_id: msg.chat.id,
                kind: EventKind::Text {
                    text: text.clone(),
                    entities: msg.entities.iter().map(text_entity).collect(),
                },
            });
        }
        if let Some(cb) = &self.callback_query {
            let payload = cb.data.as_ref()?;
            if cb.from.is_bot {
                return None;
            }
            let (chat_id, message_id) = match &cb.message {
                Some(m) => (m.chat.id, m.message_id),
                None => (cb.from.id, 0),
            };
            return Some(IncomingEvent {
                actor: actor_ref(&cb.from),
                chat_id,
                kind: EventKind::Callback {
                    callback_id: cb.id.clone(),
                    payload: payload.clone(),
                    message_id,
                },
            });
        }
        None
    }
}

fn actor_ref(user: &User) -> ActorRef {
    ActorRef {
        id: user.id,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    }
}

fn text_entity(e: &ApiEntity) -> TextEntity {
    TextEntity {
        kind: e.kind.clone(),
        offset: e.offset,
        length: e.length,
        url: e.url.clone(),
    }
}
