//! Dedup ledger — the persisted "already sent" set.
//!
//! Backed by a JSON file overwritten in full on every mutation. A crash
//! between send and persist can at worst cause one duplicate send on the
//! next boot; it can never lose a notification. Entries are never evicted
//! here — keys for appointments deleted upstream are harmless garbage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use carillon_core::error::{CarillonError, Result};
use carillon_core::types::RuleKind;

/// Identity of one delivered reminder.
///
/// `appointment_at` is only populated under the reschedule-resets policy;
/// with it set, editing the appointment's date/time produces a fresh key
/// and re-arms the rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub appointment_id: u64,
    pub rule: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_at: Option<NaiveDateTime>,
}

impl DedupKey {
    pub fn new(appointment_id: u64, rule: RuleKind) -> Self {
        Self {
            appointment_id,
            rule,
            appointment_at: None,
        }
    }

    pub fn pinned(appointment_id: u64, rule: RuleKind, appointment_at: NaiveDateTime) -> Self {
        Self {
            appointment_id,
            rule,
            appointment_at: Some(appointment_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerEntry {
    appointment_id: u64,
    rule: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    appointment_at: Option<NaiveDateTime>,
    sent_at: DateTime<Local>,
}

/// Durable map of delivered reminders.
pub struct DedupLedger {
    path: PathBuf,
    entries: HashMap<DedupKey, DateTime<Local>>,
}

impl DedupLedger {
    /// Open the ledger file, merging any persisted entries into memory.
    /// A missing or unreadable file starts empty rather than failing —
    /// the worker must come up even with damaged state.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<LedgerEntry>>(&raw) {
                Ok(list) => list
                    .into_iter()
                    .map(|e| {
                        (
                            DedupKey {
                                appointment_id: e.appointment_id,
                                rule: e.rule,
                                appointment_at: e.appointment_at,
                            },
                            e.sent_at,
                        )
                    })
                    .collect(),
                Err(e) => {
                    tracing::warn!("⚠️ Failed to parse {}: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_sent(&self, key: &DedupKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Record a delivered reminder and write the ledger through to disk.
    ///
    /// The in-memory mark sticks even when the write fails — an
    /// un-persisted mark beats a crashed or spamming worker — but the
    /// failure is surfaced to the caller for logging.
    pub fn mark_sent(&mut self, key: DedupKey, at: DateTime<Local>) -> Result<()> {
        self.entries.insert(key, at);
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CarillonError::Persist(format!("ledger dir: {e}")))?;
        }
        let mut list: Vec<LedgerEntry> = self
            .entries
            .iter()
            .map(|(key, sent_at)| LedgerEntry {
                appointment_id: key.appointment_id,
                rule: key.rule,
                appointment_at: key.appointment_at,
                sent_at: *sent_at,
            })
            .collect();
        list.sort_by_key(|e| (e.appointment_id, e.rule.as_str()));
        let json = serde_json::to_string_pretty(&list)
            .map_err(|e| CarillonError::Persist(format!("ledger serialize: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| CarillonError::Persist(format!("ledger write: {e}")))?;
        Ok(())
    }
}
