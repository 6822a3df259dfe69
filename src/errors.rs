//! Unified application error type.
//! All modules (db, sync, core, cli) return AppError to keep the error
//! handling consistent and easy to manage.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO / local storage
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Remote replica
    // ---------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Owner reference has no remote id yet: {0}")]
    UnresolvedReference(String),

    #[error("Malformed remote document: {0}")]
    MalformedDocument(String),

    // ---------------------------
    // Timer state machine
    // ---------------------------
    #[error("A timer is already running (started at {0})")]
    AlreadyRunning(String),

    #[error("No timer is running")]
    NotRunning,

    #[error("Entry was deleted but the new timer could not be created: {0}")]
    LostEntry(String),

    // ---------------------------
    // Parsing / lookup errors
    // ---------------------------
    #[error("Invalid date/time: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the failed operation left the record eligible for the
    /// reconciliation sweep instead of losing data.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::UnresolvedReference(_)
        )
    }
}
