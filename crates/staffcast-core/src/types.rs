//! Inbound event types shared between the transport and the dialog engine.

use serde::{Deserialize, Serialize};

/// Telegram user id.
pub type UserId = i64;
/// Telegram chat id (may be a user, group, or supergroup).
pub type ChatId = i64;

/// The party a conversation event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ActorRef {
    /// Best human-readable label for logs and operator messages.
    pub fn display_name(&self) -> String {
        if let Some(u) = &self.username {
            return format!("@{u}");
        }
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            _ => self.id.to_string(),
        }
    }
}

/// A formatting/annotation span attached to a text message.
/// Kept opaque: rendering is not this system's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEntity {
    pub kind: String,
    pub offset: u32,
    pub length: u32,
    pub url: Option<String>,
}

/// What kind of inbound event arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A plain text message.
    Text {
        text: String,
        entities: Vec<TextEntity>,
    },
    /// A button press carrying its raw JSON payload.
    Callback {
        callback_id: String,
        payload: String,
        message_id: i64,
    },
}

/// One inbound event, normalized from the transport's update format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    pub actor: ActorRef,
    pub chat_id: ChatId,
    pub kind: EventKind,
}

impl IncomingEvent {
    /// The text of a text event, `None` for callbacks.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Text { text, .. } => Some(text),
            EventKind::Callback { .. } => None,
        }
    }

    /// The payload of a callback event, `None` for text.
    pub fn callback_payload(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Callback { payload, .. } => Some(payload),
            EventKind::Text { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_username() {
        let actor = ActorRef {
            id: 42,
            username: Some("alice".into()),
            first_name: Some("Alice".into()),
            last_name: None,
        };
        assert_eq!(actor.display_name(), "@alice");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let actor = ActorRef {
            id: 42,
            username: None,
            first_name: None,
            last_name: None,
        };
        assert_eq!(actor.display_name(), "42");
    }
}
