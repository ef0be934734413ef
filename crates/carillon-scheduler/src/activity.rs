//! Activity log sink — append-only audit trail of every dispatch attempt.
//!
//! Line format: `timestamp | patient | address | description | status`.
//! The file grows until an operator explicitly clears it; views read a
//! bounded tail.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use carillon_core::error::{CarillonError, Result};
use carillon_core::types::AttemptStatus;

/// Status column of an activity line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Sent,
    Failed,
    Logged,
    Info,
    Error,
}

impl From<AttemptStatus> for LogStatus {
    fn from(status: AttemptStatus) -> Self {
        match status {
            AttemptStatus::Sent => LogStatus::Sent,
            AttemptStatus::Logged => LogStatus::Logged,
            AttemptStatus::Failed => LogStatus::Failed,
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogStatus::Sent => "SENT",
            LogStatus::Failed => "FAILED",
            LogStatus::Logged => "LOGGED",
            LogStatus::Info => "INFO",
            LogStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One parsed activity line, newest-first in tail views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub at: String,
    pub patient: String,
    pub target: String,
    pub description: String,
    pub status: String,
}

/// Append-only activity log file.
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one activity line.
    pub fn record(
        &self,
        patient: &str,
        target: &str,
        description: &str,
        status: LogStatus,
    ) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CarillonError::Persist(format!("activity dir: {e}")))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CarillonError::Persist(format!("activity open: {e}")))?;
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(
            file,
            "{timestamp} | {} | {} | {} | {status}",
            sanitize(patient),
            sanitize(target),
            sanitize(description)
        )
        .map_err(|e| CarillonError::Persist(format!("activity write: {e}")))?;
        Ok(())
    }

    /// The most recent `limit` entries, newest first. A missing or
    /// unreadable file reads as empty.
    pub fn tail(&self, limit: usize) -> Vec<ActivityEntry> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let mut entries: Vec<ActivityEntry> = raw
            .lines()
            .filter_map(parse_line)
            .collect();
        entries.reverse();
        entries.truncate(limit);
        entries
    }

    /// Truncate the log. Operator action only — nothing in the engine
    /// calls this.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::write(&self.path, "")
                .map_err(|e| CarillonError::Persist(format!("activity clear: {e}")))?;
        }
        Ok(())
    }
}

// Field values share the line with the column separator.
fn sanitize(field: &str) -> String {
    field.replace('|', "/").replace('\n', " ")
}

fn parse_line(line: &str) -> Option<ActivityEntry> {
    let mut parts = line.splitn(5, " | ");
    Some(ActivityEntry {
        at: parts.next()?.to_string(),
        patient: parts.next()?.to_string(),
        target: parts.next()?.to_string(),
        description: parts.next()?.to_string(),
        status: parts.next()?.to_string(),
    })
}
