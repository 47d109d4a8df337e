//! # StaffCast Cache
//! In-process caches: a TTL key/value store backing per-actor conversation
//! state, and the roster cache holding admins, cohorts, and team chats.

pub mod roster;
pub mod ttl;

pub use roster::{Cohort, CohortMember, RosterCache, RosterSnapshot};
pub use ttl::TtlCache;
