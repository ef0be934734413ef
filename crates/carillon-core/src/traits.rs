//! Seam traits between the engine and its collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Appointment, ChannelKind};

/// One delivery channel's send capability.
///
/// The engine renders the message content itself; implementations only carry
/// it to the patient (or queue it for something that will). Failures are
/// reported through `Err` and recorded as failed dispatch attempts — the
/// engine retries naturally on a later cycle while the dedup key is unsent.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Which channel this notifier delivers on.
    fn channel(&self) -> ChannelKind;

    /// Deliver one message to `address`. `subject` is `None` for channels
    /// without a subject line.
    async fn send(&self, address: &str, subject: Option<&str>, body: &str) -> Result<()>;
}

/// The upstream appointment store.
///
/// `snapshot` must return a stable, fully-materialized copy each time it is
/// called — never a live view. The engine requests one snapshot per cycle
/// and treats it as read-only.
#[async_trait]
pub trait AppointmentSource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<Appointment>>;
}
