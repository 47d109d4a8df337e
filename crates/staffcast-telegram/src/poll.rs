//! Long polling — turns Bot API updates into a stream of inbound events.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::Stream;
use staffcast_core::types::IncomingEvent;

use crate::api::TelegramApi;

/// Long-poll driver. Consumed by [`start`](Self::start), which owns the
/// polling loop for the life of the process.
pub struct Poller {
    api: Arc<TelegramApi>,
    poll_timeout: u64,
    last_update_id: i64,
}

impl Poller {
    pub fn new(api: Arc<TelegramApi>, poll_timeout: u64) -> Self {
        Self {
            api,
            poll_timeout,
            last_update_id: 0,
        }
    }

    /// Spawn the polling loop and return the stream of inbound events.
    pub fn start(self) -> PollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut poller = self;
            tracing::info!("update polling loop started");

            loop {
                match poller
                    .api
                    .get_updates(poller.last_update_id + 1, poller.poll_timeout)
                    .await
                {
                    Ok(updates) => {
                        if let Some(last) = updates.last() {
                            poller.last_update_id = last.update_id;
                        }
                        for update in updates {
                            if let Some(event) = update.to_event()
                                && tx.send(event).is_err()
                            {
                                tracing::info!("polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("polling error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    }
                }
            }
        });

        PollingStream { rx }
    }
}

/// Stream of inbound events produced by the polling loop.
pub struct PollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<IncomingEvent>,
}

impl PollingStream {
    /// Receive the next event; `None` once the polling loop has exited.
    pub async fn recv(&mut self) -> Option<IncomingEvent> {
        self.rx.recv().await
    }
}

impl Stream for PollingStream {
    type Item = IncomingEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for PollingStream {}
