//! Collaborator seams.
//!
//! The spreadsheet, CRM, and relational layers live outside this system;
//! the dialog only sees them as trait objects that succeed or fail. The
//! in-memory mailing store below backs the binary and the tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use staffcast_cache::RosterSnapshot;
use staffcast_core::types::ActorRef;
use staffcast_core::{Result, StaffcastError};

use crate::model::{DeliveryStatus, MailingDraft, MailingRecord};

/// Outcome of one delivery attempt, recorded per recipient.
#[derive(Debug, Clone, Copy)]
pub enum DeliveryOutcome {
    Delivered { chat_id: i64, message_id: i64 },
    Failed,
}

/// The mailing store.
#[async_trait]
pub trait MailingService: Send + Sync {
    /// Persist a new mailing and its recipient statuses; returns the id.
    async fn create(&self, draft: MailingDraft) -> Result<i64>;

    /// The oldest mailing that is neither finished nor expired, with its
    /// statuses; `None` when the queue is empty.
    async fn next_pending(&self) -> Result<Option<(MailingRecord, Vec<DeliveryStatus>)>>;

    /// All mailings that have not been deleted.
    async fn active(&self) -> Result<Vec<MailingRecord>>;

    async fn with_statuses(&self, mailing_id: i64)
    -> Result<(MailingRecord, Vec<DeliveryStatus>)>;

    async fn record_delivery(&self, status_id: i64, outcome: DeliveryOutcome) -> Result<()>;

    async fn mark_finished(&self, mailing_id: i64) -> Result<()>;

    /// Flip the reaction flag for one recipient and return the status.
    async fn mark_reacted(&self, status_id: i64) -> Result<DeliveryStatus>;

    async fn delete(&self, mailing_id: i64) -> Result<()>;

    /// Mark mailings older than `age` expired; returns the ids that
    /// newly flipped.
    async fn expire_older_than(&self, age: Duration) -> Result<Vec<i64>>;
}

/// Actor identity sink (the relational layer in production).
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn upsert(&self, actor: &ActorRef) -> Result<()>;
}

/// Directory that remembers nothing.
pub struct NoopDirectory;

#[async_trait]
impl ActorDirectory for NoopDirectory {
    async fn upsert(&self, _actor: &ActorRef) -> Result<()> {
        Ok(())
    }
}

/// The spreadsheet-backed refresh flows.
#[async_trait]
pub trait DataRefresh: Send + Sync {
    async fn refresh_web_forms(&self) -> Result<()>;

    /// Pull a fresh roster (admins, cohorts, team chats).
    async fn refresh_roster(&self) -> Result<RosterSnapshot>;
}

/// Refresh stub for deployments without a spreadsheet collaborator.
pub struct NoopRefresh;

#[async_trait]
impl DataRefresh for NoopRefresh {
    async fn refresh_web_forms(&self) -> Result<()> {
        Err(StaffcastError::Service("no form data source configured".into()))
    }

    async fn refresh_roster(&self) -> Result<RosterSnapshot> {
        Err(StaffcastError::Service("no roster source configured".into()))
    }
}

/// Lesson-notification acknowledgments (the CRM flow in production).
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn acknowledge(&self, notification_uid: &str, actor: &ActorRef) -> Result<()>;
}

pub struct NoopNotifications;

#[async_trait]
impl NotificationService for NoopNotifications {
    async fn acknowledge(&self, notification_uid: &str, actor: &ActorRef) -> Result<()> {
        tracing::info!(
            uid = notification_uid,
            actor = actor.id,
            "notification acknowledged (no CRM sink configured)"
        );
        Ok(())
    }
}

// --- In-memory mailing store ---

#[derive(Default)]
struct MailingTable {
    next_mailing_id: i64,
    next_status_id: i64,
    mailings: BTreeMap<i64, MailingRecord>,
    statuses: BTreeMap<i64, DeliveryStatus>,
}

/// Process-local [`MailingService`] used by the binary and the tests.
#[derive(Default)]
pub struct InMemoryMailings {
    table: Mutex<MailingTable>,
}

impl InMemoryMailings {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MailingTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MailingService for InMemoryMailings {
    async fn create(&self, draft: MailingDraft) -> Result<i64> {
        let mut table = self.lock();
        table.next_mailing_id += 1;
        let mailing_id = table.next_mailing_id;
        table.mailings.insert(
            mailing_id,
            MailingRecord {
                id: mailing_id,
                author_id: draft.author_id,
                kind: draft.kind,
                cohort_name: draft.cohort_name,
                text: draft.text,
                with_button: draft.with_button,
                created_at: Utc::now(),
                finished: false,
                expired: false,
            },
        );
        for recipient in draft.recipients {
            table.next_status_id += 1;
            let status_id = table.next_status_id;
            table.statuses.insert(
                status_id,
                DeliveryStatus {
                    id: status_id,
                    mailing_id,
                    display_name: recipient.display_name,
                    chat_id: recipient.chat_id,
                    message_id: 0,
                    sent: false,
                    failed: false,
                    reacted: false,
                },
            );
        }
        Ok(mailing_id)
    }

    async fn next_pending(&self) -> Result<Option<(MailingRecord, Vec<DeliveryStatus>)>> {
        let table = self.lock();
        let Some(mailing) = table
            .mailings
            .values()
            .find(|m| !m.finished && !m.expired)
            .cloned()
        else {
            return Ok(None);
        };
        let statuses = table
            .statuses
            .values()
            .filter(|s| s.mailing_id == mailing.id)
            .cloned()
            .collect();
        Ok(Some((mailing, statuses)))
    }

    async fn active(&self) -> Result<Vec<MailingRecord>> {
        Ok(self.lock().mailings.values().cloned().collect())
    }

    async fn with_statuses(
        &self,
        mailing_id: i64,
    ) -> Result<(MailingRecord, Vec<DeliveryStatus>)> {
        let table = self.lock();
        let mailing = table
            .mailings
            .get(&mailing_id)
            .cloned()
            .ok_or_else(|| StaffcastError::Service(format!("mailing {mailing_id} not found")))?;
        let statuses = table
            .statuses
            .values()
            .filter(|s| s.mailing_id == mailing_id)
            .cloned()
            .collect();
        Ok((mailing, statuses))
    }

    async fn record_delivery(&self, status_id: i64, outcome: DeliveryOutcome) -> Result<()> {
        let mut table = self.lock();
        let status = table
            .statuses
            .get_mut(&status_id)
            .ok_or_else(|| StaffcastError::Service(format!("status {status_id} not found")))?;
        match outcome {
            DeliveryOutcome::Delivered {
                chat_id,
                message_id,
            } => {
                status.sent = true;
                status.failed = false;
                status.chat_id = chat_id;
                status.message_id = message_id;
            }
            DeliveryOutcome::Failed => {
                status.sent = false;
                status.failed = true;
            }
        }
        Ok(())
    }

    async fn mark_finished(&self, mailing_id: i64) -> Result<()> {
        let mut table = self.lock();
        let mailing = table
            .mailings
            .get_mut(&mailing_id)
            .ok_or_else(|| StaffcastError::Service(format!("mailing {mailing_id} not found")))?;
        mailing.finished = true;
        Ok(())
    }

    async fn mark_reacted(&self, status_id: i64) -> Result<DeliveryStatus> {
        let mut table = self.lock();
        let status = table
            .statuses
            .get_mut(&status_id)
            .ok_or_else(|| StaffcastError::Service(format!("status {status_id} not found")))?;
        status.reacted = true;
        Ok(status.clone())
    }

    async fn delete(&self, mailing_id: i64) -> Result<()> {
        let mut table = self.lock();
        table.mailings.remove(&mailing_id);
        table.statuses.retain(|_, s| s.mailing_id != mailing_id);
        Ok(())
    }

    async fn expire_older_than(&self, age: Duration) -> Result<Vec<i64>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(age)
                .map_err(|e| StaffcastError::Service(format!("bad expiry age: {e}")))?;
        let mut table = self.lock();
        let mut expired = Vec::new();
        for mailing in table.mailings.values_mut() {
            if !mailing.expired && mailing.created_at < cutoff {
                mailing.expired = true;
                expired.push(mailing.id);
            }
        }
        Ok(expired)
    }
}
