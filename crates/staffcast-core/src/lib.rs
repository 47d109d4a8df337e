//! # StaffCast Core
//! Shared foundation: the error enum, the TOML configuration, and the
//! inbound event types every other crate speaks.

pub mod config;
pub mod error;
pub mod types;

pub use config::StaffcastConfig;
pub use error::{Result, StaffcastError};
pub use types::{ActorRef, ChatId, EventKind, IncomingEvent, TextEntity, UserId};
