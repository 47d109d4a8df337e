//! # StaffCast Telegram
//! The messaging platform edge: Bot API wire types, the reqwest client,
//! long polling, and the scheduler-coupled outbox that serializes every
//! outbound call and resolves recipient chat-id encodings by trial.

pub mod api;
pub mod keyboard;
pub mod outbox;
pub mod poll;
pub mod transport;
pub mod types;

pub use api::TelegramApi;
pub use keyboard::{inline_keyboard, remove_keyboard, reply_keyboard};
pub use outbox::{Outbox, candidate_chat_ids, supergroup_variant};
pub use poll::{Poller, PollingStream};
pub use transport::Transport;
pub use types::{OutgoingMessage, ReplyMarkup, SentMessage, Update};
