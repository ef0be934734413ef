//! # Carillon Scheduler
//!
//! The reminder scheduling and dispatch engine: evaluates every appointment
//! against fixed lead-time rules, dedups against a durable ledger, and
//! delegates delivery to channel notifiers — without ever sending twice or
//! outside business hours.
//!
//! ## Architecture
//! ```text
//! ReminderEngine (tokio task, one worker)
//!   └── every poll interval:
//!         business-hours gate ── closed → skip cycle
//!         AppointmentSource::snapshot()
//!         for each appointment × rule:
//!           due window? ── dedup ledger? ── Dispatcher
//!                                             ├── WhatsApp notifier
//!                                             └── Email notifier
//!         any channel success → ledger.mark_sent (write-through)
//!         every attempt → activity log (append-only)
//! ```
//!
//! Manual "run now" passes share the same cycle path under a single-flight
//! lock, keyed in their own `manual` dedup namespace.

pub mod activity;
pub mod dispatch;
pub mod engine;
pub mod hours;
pub mod ledger;
pub mod source;
pub mod window;

pub use activity::{ActivityEntry, ActivityLog, LogStatus};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use engine::{CycleStats, ManualStats, ReminderEngine};
pub use ledger::{DedupKey, DedupLedger};
pub use source::JsonFileSource;
