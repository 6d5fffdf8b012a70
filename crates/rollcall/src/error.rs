//! Error types for rollcall.
//!
//! Only two kinds of failure reach an instructor: validation failures (a wrong
//! PIN or session code, which they can retry) and infrastructure failures from
//! the store or configuration. Unknown student or request ids are not errors at
//! all; the operations that take them are silent no-ops.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// The attendance database could not be opened.
    #[error("cannot open attendance store {path}: {source}")]
    DatabaseOpen {
        /// Database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A statement against the store failed.
    #[error("store query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// The schema could not be brought up to date.
    #[error("schema migration failed: {message}")]
    DatabaseMigration {
        /// What went wrong.
        message: String,
    },

    /// The in-memory store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    StorePoisoned,

    /// The data directory could not be created.
    #[error("cannot create data directory {path}: {source}")]
    DirectoryCreate {
        /// Directory that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Configuration sources could not be merged or parsed.
    #[error("cannot load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// A configuration value is out of range.
    #[error("bad configuration: {message}")]
    ConfigValidation {
        /// Which value is wrong and why.
        message: String,
    },

    // === Access Errors ===
    /// The PIN did not match.
    #[error("incorrect PIN")]
    InvalidPin,

    /// The session code did not match.
    #[error("invalid session code")]
    InvalidSessionCode,

    /// No valid session token is stored, or it has expired.
    #[error("not authenticated; run `rollcall login <PIN>` first")]
    NotAuthenticated,

    /// The requested class is not known.
    #[error("unknown class {0}")]
    UnknownClass(u32),

    /// The requested lecture is not on the timetable.
    #[error("unknown lecture {0}")]
    UnknownLecture(u32),

    /// The lecture exists but is held on a different weekday.
    #[error("lecture {lecture_id} is not held on {date}")]
    LectureNotScheduled {
        /// Lecture identifier.
        lecture_id: u32,
        /// Requested date.
        date: chrono::NaiveDate,
    },

    // === Scan Errors ===
    /// The scan controller failed.
    #[error("scan failed: {0}")]
    Scan(#[from] crate::scan::ScanError),

    // === Serialization Errors ===
    /// A stored value could not be encoded.
    #[error("cannot encode stored value: {0}")]
    Json(#[from] serde_json::Error),

    /// Should not happen.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Wrap an unexpected failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error is a user-correctable validation failure.
    ///
    /// These are surfaced inline and the user simply retries.
    #[must_use]
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Self::InvalidPin | Self::InvalidSessionCode)
    }

    /// Check if this error means the caller must log in first.
    #[must_use]
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}
