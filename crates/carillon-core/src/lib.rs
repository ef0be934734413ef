//! # Carillon Core
//!
//! Shared foundation for the Carillon appointment reminder engine: the
//! appointment/rule/channel data model, persisted settings, error types, and
//! the seam traits collaborators implement.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{CarillonConfig, ClinicIdentity, SchedulerSettings};
pub use error::{CarillonError, Result};
pub use traits::{AppointmentSource, Notifier};
pub use types::{Appointment, AttemptStatus, ChannelKind, DispatchAttempt, RuleKind};
