//! Carillon error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CarillonError>;

/// Errors surfaced by the reminder engine and its collaborators.
#[derive(Error, Debug)]
pub enum CarillonError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Persistence error: {0}")]
    Persist(String),

    #[error("Appointment source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
