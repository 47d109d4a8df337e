//! Shared fixtures for the dialog tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use staffcast_cache::RosterCache;
use staffcast_core::config::TelegramConfig;
use staffcast_core::types::{ActorRef, EventKind, IncomingEvent};
use staffcast_core::{Result, StaffcastError};
use staffcast_scheduler::RequestScheduler;
use staffcast_telegram::transport::Transport;
use staffcast_telegram::types::{Chat, OutgoingMessage, SentMessage};
use staffcast_telegram::Outbox;

use crate::engine::DialogCtx;
use crate::services::{InMemoryMailings, NoopDirectory, NoopNotifications, NoopRefresh};
use crate::session::{ActorStates, SessionStore};

/// Transport double: records every call, fails for configured chat ids.
pub(crate) struct FakeTransport {
    pub sent: Mutex<Vec<OutgoingMessage>>,
    pub alerts: Mutex<Vec<(String, String)>>,
    pub edits: Mutex<Vec<(i64, i64, String)>>,
    pub deleted: Mutex<Vec<(i64, i64)>>,
    pub pinned: Mutex<Vec<(i64, i64)>>,
    reject: Mutex<HashSet<i64>>,
    next_message_id: Mutex<i64>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            pinned: Mutex::new(Vec::new()),
            reject: Mutex::new(HashSet::new()),
            next_message_id: Mutex::new(0),
        }
    }

    /// Make every send to these chat ids fail.
    pub fn fail_for(&self, chat_ids: &[i64]) {
        let mut reject = self.reject.lock().unwrap();
        reject.extend(chat_ids.iter().copied());
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_message(&self, msg: &OutgoingMessage) -> Result<SentMessage> {
        if self.reject.lock().unwrap().contains(&msg.chat_id) {
            return Err(StaffcastError::Channel(format!(
                "chat not found: {}",
                msg.chat_id
            )));
        }
        let mut next = self.next_message_id.lock().unwrap();
        *next += 1;
        let message_id = *next;
        self.sent.lock().unwrap().push(msg.clone());
        Ok(SentMessage {
            message_id,
            from: None,
            chat: Chat {
                id: msg.chat_id,
                chat_type: "private".into(),
                title: None,
            },
            text: Some(msg.text.clone()),
            date: 0,
            entities: vec![],
        })
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        self.edits
            .lock()
            .unwrap()
            .push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn pin_message(&self, chat_id: i64, message_id: i64, _: bool) -> Result<()> {
        self.pinned.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn unpin_all(&self, _: i64) -> Result<()> {
        Ok(())
    }

    async fn send_sticker(&self, chat_id: i64, _: &str) -> Result<SentMessage> {
        self.send_message(&OutgoingMessage::new(chat_id, "[sticker]"))
            .await
    }

    async fn answer_callback(&self, callback_id: &str, text: &str, _: bool) -> Result<()> {
        self.alerts
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// A fully wired context over fakes, with started schedulers.
pub(crate) async fn test_ctx(admin_ids: &[i64]) -> (Arc<DialogCtx>, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::new());

    let messages = Arc::new(RequestScheduler::new(
        "messages",
        64,
        Duration::from_secs(5),
    ));
    let callbacks = Arc::new(RequestScheduler::new(
        "callbacks",
        64,
        Duration::from_secs(5),
    ));
    messages.start(Duration::from_millis(1)).unwrap();
    callbacks.start(Duration::from_millis(1)).unwrap();

    let outbox = Arc::new(Outbox::new(
        transport.clone() as Arc<dyn Transport>,
        messages,
        callbacks,
        TelegramConfig {
            ops_chat_id: 999,
            ..TelegramConfig::default()
        },
    ));

    let ttl = Duration::from_secs(60);
    let sweep = Duration::from_secs(60);
    let ctx = Arc::new(DialogCtx::new(
        outbox,
        SessionStore::new(ttl, sweep),
        ActorStates::new(ttl, sweep),
        Arc::new(RosterCache::with_admins(admin_ids.to_vec())),
        Arc::new(InMemoryMailings::new()),
        Arc::new(NoopDirectory),
        Arc::new(NoopRefresh),
        Arc::new(NoopNotifications),
        TelegramConfig {
            ops_chat_id: 999,
            ..TelegramConfig::default()
        },
    ));
    (ctx, transport)
}

pub(crate) fn text_event(actor_id: i64, text: &str) -> IncomingEvent {
    IncomingEvent {
        actor: ActorRef {
            id: actor_id,
            username: Some(format!("user{actor_id}")),
            first_name: None,
            last_name: None,
        },
        chat_id: actor_id,
        kind: EventKind::Text {
            text: text.into(),
            entities: vec![],
        },
    }
}

pub(crate) async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
