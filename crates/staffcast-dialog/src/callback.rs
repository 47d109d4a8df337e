//! Callback payloads — the JSON carried inside inline buttons.
//!
//! The wire format keeps the original field names (`ActionType`
//! discriminant, `MailingID`, ...) so buttons sent before an upgrade keep
//! working; in-process the payload is a closed enum matched exhaustively.

use serde::{Deserialize, Serialize};
use staffcast_core::{Result, StaffcastError};

/// What a pressed button asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ActionType")]
pub enum CallbackAction {
    /// Recipient confirmed receipt of a mailing message.
    Mailing {
        #[serde(rename = "MailingID")]
        mailing_id: i64,
        #[serde(rename = "StatusID")]
        status_id: i64,
    },
    /// Show full per-recipient statistics for a mailing.
    Statistic {
        #[serde(rename = "MailingID")]
        mailing_id: i64,
    },
    /// Statistics plus a cancel button.
    StatisticWithButtonDelete {
        #[serde(rename = "MailingID")]
        mailing_id: i64,
    },
    /// Cancel a mailing: delete its delivered messages and the record.
    StatisticDeleting {
        #[serde(rename = "MailingID")]
        mailing_id: i64,
    },
    /// Acknowledge a lesson notification.
    Notification {
        #[serde(rename = "NotificationUID")]
        notification_uid: String,
    },
    /// Kick off a data refresh.
    #[serde(rename = "update")]
    Update {
        #[serde(rename = "updateType")]
        update_type: UpdateKind,
    },
}

/// Which dataset a refresh targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    WebForm,
    Admins,
}

impl CallbackAction {
    /// Parse a raw callback payload. Unknown `ActionType` values and
    /// malformed JSON both land here as errors; the caller shows the
    /// generic "unknown command" alert.
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload)
            .map_err(|e| StaffcastError::Dialog(format!("unparseable callback payload: {e}")))
    }

    /// Encode for embedding in an inline button.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_original_wire_format() {
        let action =
            CallbackAction::parse(r#"{"ActionType":"Mailing","MailingID":7,"StatusID":12}"#)
                .unwrap();
        assert_eq!(
            action,
            CallbackAction::Mailing {
                mailing_id: 7,
                status_id: 12
            }
        );
    }

    #[test]
    fn parses_update_kind() {
        let action =
            CallbackAction::parse(r#"{"ActionType":"update","updateType":"webForm"}"#).unwrap();
        assert_eq!(
            action,
            CallbackAction::Update {
                update_type: UpdateKind::WebForm
            }
        );
    }

    #[test]
    fn unknown_action_type_is_an_error() {
        let err = CallbackAction::parse(r#"{"ActionType":"SelfDestruct"}"#).unwrap_err();
        assert!(matches!(err, StaffcastError::Dialog(_)));
    }

    #[test]
    fn payload_roundtrip_keeps_field_names() {
        let payload = CallbackAction::StatisticDeleting { mailing_id: 3 }.to_payload();
        assert_eq!(payload, r#"{"ActionType":"StatisticDeleting","MailingID":3}"#);
        assert_eq!(
            CallbackAction::parse(&payload).unwrap(),
            CallbackAction::StatisticDeleting { mailing_id: 3 }
        );
    }
}
