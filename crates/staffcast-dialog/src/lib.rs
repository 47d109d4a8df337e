//! # StaffCast Dialog
//!
//! The per-actor conversational state machine. Inbound events resolve the
//! actor's named state, run global interceptors and the local state's
//! entrance action, and dispatch through text/callback routing tables with
//! catch-all fallbacks. Handlers move actors between states explicitly.
//!
//! Events are processed by a bounded worker pool with per-actor affinity,
//! so one actor's events can never race each other on their session record.

pub mod callback;
pub mod engine;
pub mod handlers;
pub mod model;
pub mod registry;
pub mod runner;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

pub use callback::{CallbackAction, UpdateKind};
pub use engine::{DialogCtx, DialogEngine, process_event};
pub use model::{DeliveryStatus, MailingDraft, MailingKind, MailingRecord, Recipient};
pub use registry::{StateRegistry, default_registry};
pub use services::{
    ActorDirectory, DataRefresh, DeliveryOutcome, InMemoryMailings, MailingService,
    NoopDirectory, NoopNotifications, NoopRefresh, NotificationService,
};
pub use session::{ActorStates, Session, SessionStore};
pub use state::{Handler, StateDef, StateId};
