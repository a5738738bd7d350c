//! Cache Error Types
//!
//! Transaction outcomes get their own kinds so callers can tell a failed
//! commit apart from a unit of work that failed and could not be undone.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("upload not found: {_0}")]
    UploadNotFound(#[error(not(source))] i64),
    /// A row or model could not be converted.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// The work succeeded but the transaction would not commit.
    #[display("failed to commit transaction")]
    Commit,
    /// A rollback attempt failed.
    #[display("failed to roll back transaction")]
    Rollback,
    /// The work failed and so did the rollback; both are attached as children.
    #[display("unit of work failed and its transaction could not be rolled back")]
    RollbackFailed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // SQLITE_BUSY surfaces as a plain database error after busy_timeout.
        matches!(self, Self::Database | Self::Commit)
    }
}
