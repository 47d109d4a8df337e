//! StaffCast error types.

use thiserror::Error;

/// Result type alias used across the workspace.
pub type Result<T> = std::result::Result<T, StaffcastError>;

/// Workspace-wide error enum.
#[derive(Error, Debug)]
pub enum StaffcastError {
    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// The messaging platform rejected or failed a call.
    #[error("channel error: {0}")]
    Channel(String),

    /// A request was submitted to a scheduler that is not running.
    #[error("scheduler is not running")]
    SchedulerNotRunning,

    /// The scheduler shut down before the awaited request executed.
    #[error("request was dropped before execution")]
    RequestDropped,

    /// The synchronous wait on a scheduled request timed out.
    #[error("timed out waiting for request execution")]
    AwaitTimeout,

    /// A scheduled request executed and returned an error.
    #[error("request failed: {0}")]
    Request(String),

    /// Every candidate chat-id encoding failed for a delivery.
    #[error("delivery exhausted for recipient {recipient}: {reason}")]
    DeliveryExhausted { recipient: i64, reason: String },

    /// A dialog handler could not complete.
    #[error("dialog error: {0}")]
    Dialog(String),

    /// The acting user lacks admin rights.
    #[error("user {0} is not an admin")]
    NotAdmin(i64),

    /// A collaborator service (mailing store, roster source, ...) failed.
    #[error("service error: {0}")]
    Service(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl StaffcastError {
    /// Shorthand for ad-hoc errors that fit no other variant.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
