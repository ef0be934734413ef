//! File-backed appointment source.
//!
//! The upstream store maintains the snapshot file; the engine only ever
//! reads it. Each call re-reads and fully materializes the list, so a
//! cycle works against a stable copy no matter what the store does to the
//! file afterwards.

use std::path::PathBuf;

use async_trait::async_trait;

use carillon_core::error::{CarillonError, Result};
use carillon_core::traits::AppointmentSource;
use carillon_core::types::Appointment;

/// Reads appointment snapshots from a JSON file.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AppointmentSource for JsonFileSource {
    async fn snapshot(&self) -> Result<Vec<Appointment>> {
        if !self.path.exists() {
            // A fresh install has no snapshot yet; that is not a fault.
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| CarillonError::Source(format!("read {}: {e}", self.path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| CarillonError::Source(format!("parse {}: {e}", self.path.display())))
    }
}
