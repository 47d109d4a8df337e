//! Mailing domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffcast_cache::RosterCache;
use staffcast_core::{Result, StaffcastError};

/// Where a mailing goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailingKind {
    /// One message per staff member, direct.
    DirectMessage,
    /// One message per member's manager chat.
    ManagerChat,
    /// One message per configured team chat.
    TeamChat,
}

impl std::fmt::Display for MailingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailingKind::DirectMessage => write!(f, "direct messages"),
            MailingKind::ManagerChat => write!(f, "manager chat"),
            MailingKind::TeamChat => write!(f, "team chat"),
        }
    }
}

/// One resolved delivery target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub display_name: String,
    pub chat_id: i64,
}

/// A fully assembled mailing ready to be stored and dispatched.
#[derive(Debug, Clone)]
pub struct MailingDraft {
    pub author_id: i64,
    pub kind: MailingKind,
    pub cohort_name: String,
    pub text: String,
    /// Direct-message mailings carry a confirmation button.
    pub with_button: bool,
    pub recipients: Vec<Recipient>,
}

/// A stored mailing.
#[derive(Debug, Clone)]
pub struct MailingRecord {
    pub id: i64,
    pub author_id: i64,
    pub kind: MailingKind,
    pub cohort_name: String,
    pub text: String,
    pub with_button: bool,
    pub created_at: DateTime<Utc>,
    pub finished: bool,
    pub expired: bool,
}

/// Per-recipient delivery bookkeeping.
#[derive(Debug, Clone)]
pub struct DeliveryStatus {
    pub id: i64,
    pub mailing_id: i64,
    pub display_name: String,
    /// The chat id delivery last targeted; updated to the resolved
    /// encoding once a send goes through.
    pub chat_id: i64,
    pub message_id: i64,
    pub sent: bool,
    pub failed: bool,
    pub reacted: bool,
}

impl DeliveryStatus {
    /// Glyph used in operator-facing summaries.
    pub fn summary_glyph(&self) -> &'static str {
        match (self.sent, self.reacted, self.failed) {
            (true, true, _) => "✅ delivered, confirmed",
            (true, false, _) => "🟧 delivered, no confirmation",
            (_, _, true) => "🟥 delivery failed",
            _ => "⌛ not sent yet",
        }
    }
}

/// Resolve the delivery targets for a mailing from the roster.
pub fn build_recipients(
    kind: MailingKind,
    cohort_name: &str,
    roster: &RosterCache,
) -> Result<Vec<Recipient>> {
    let recipients = match kind {
        MailingKind::TeamChat => roster
            .team_chats()
            .into_iter()
            .map(|chat_id| Recipient {
                display_name: format!("team chat {chat_id}"),
                chat_id,
            })
            .collect(),
        MailingKind::DirectMessage | MailingKind::ManagerChat => {
            let cohort = roster.cohort_by_name(cohort_name).ok_or_else(|| {
                StaffcastError::Dialog(format!("cohort {cohort_name:?} not found"))
            })?;
            cohort
                .members
                .iter()
                .filter_map(|member| {
                    let (chat_id, label) = match kind {
                        MailingKind::DirectMessage => {
                            (member.user_id, member.display_name.clone())
                        }
                        _ => (
                            member.manager_chat_id,
                            format!("manager chat of {}", member.display_name),
                        ),
                    };
                    (chat_id != 0).then_some(Recipient {
                        display_name: label,
                        chat_id,
                    })
                })
                .collect()
        }
    };
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffcast_cache::{Cohort, CohortMember, RosterSnapshot};

    fn roster() -> RosterCache {
        RosterCache::new(RosterSnapshot {
            admin_ids: vec![],
            cohorts: vec![Cohort {
                name: "Night".into(),
                members: vec![
                    CohortMember {
                        display_name: "@a".into(),
                        user_id: 11,
                        manager_chat_id: 21,
                    },
                    CohortMember {
                        display_name: "@b".into(),
                        user_id: 0,
                        manager_chat_id: 22,
                    },
                ],
            }],
            team_chats: vec![-100777, -100778],
        })
    }

    #[test]
    fn direct_message_recipients_skip_unknown_ids() {
        let recipients =
            build_recipients(MailingKind::DirectMessage, "night", &roster()).unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].chat_id, 11);
    }

    #[test]
    fn manager_chat_recipients_use_manager_ids() {
        let recipients = build_recipients(MailingKind::ManagerChat, "Night", &roster()).unwrap();
        let ids: Vec<i64> = recipients.iter().map(|r| r.chat_id).collect();
        assert_eq!(ids, vec![21, 22]);
    }

    #[test]
    fn team_chat_ignores_cohort() {
        let recipients = build_recipients(MailingKind::TeamChat, "", &roster()).unwrap();
        assert_eq!(recipients.len(), 2);
    }

    #[test]
    fn missing_cohort_is_an_error() {
        assert!(build_recipients(MailingKind::DirectMessage, "ghost", &roster()).is_err());
    }
}
