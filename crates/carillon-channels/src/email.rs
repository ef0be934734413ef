//! Email channel — file outbox.
//!
//! Renders each message into a file under an outbox directory. A mail relay
//! (or any other delivery collaborator) drains the directory; this crate
//! deliberately carries no SMTP client. Embedders with a live transport
//! plug in their own [`Notifier`] instead.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Local;

use carillon_core::error::{CarillonError, Result};
use carillon_core::traits::Notifier;
use carillon_core::types::ChannelKind;

const DEFAULT_SUBJECT: &str = "Appointment Reminder";

/// Email notifier that queues messages as files in an outbox directory.
pub struct OutboxEmailNotifier {
    dir: PathBuf,
    // Disambiguates filenames for sends within the same second.
    seq: AtomicU64,
}

impl OutboxEmailNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl Notifier for OutboxEmailNotifier {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, address: &str, subject: Option<&str>, body: &str) -> Result<()> {
        if address.is_empty() {
            return Err(CarillonError::Channel("empty email address".into()));
        }
        let subject = subject.unwrap_or(DEFAULT_SUBJECT);
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let safe_addr: String = address
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        let path = self.dir.join(format!("{stamp}-{n:04}-{safe_addr}.eml"));

        let contents = format!("To: {address}\nSubject: {subject}\n\n{body}\n");
        std::fs::write(&path, contents)
            .map_err(|e| CarillonError::Channel(format!("outbox write: {e}")))?;
        tracing::info!("📤 Email queued: {}", path.display());
        Ok(())
    }
}
