//! # StaffCast Scheduler
//!
//! Per-collaborator outbound request scheduler. Every quota-constrained
//! third-party endpoint (messaging platform, spreadsheet, CRM, analytics)
//! gets exactly one scheduler instance; many concurrent business flows
//! submit closures, one consumer loop executes them serialized with a pause
//! between requests. That single loop is the only thing standing between
//! this process and the collaborator's rate limit.
//!
//! ```text
//! submit(Normal, req) ──► [normal lane]──┐
//!                                        ├──► consumer loop ──► collaborator
//! submit(Low, req) ─────► [low lane] ────┘      (one at a time,
//!                                                pause between requests)
//! ```

pub mod lane;
pub mod pause;
pub mod scheduler;

pub use lane::Lane;
pub use pause::increment_pause;
pub use scheduler::{Request, RequestScheduler};
