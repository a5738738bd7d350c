//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The underlying [`std::io::Error`]
//! is kept as a child frame; the kind says which phase failed.

use derive_more::{Display, Error};
use hoard_stream::error::ErrorKind as StreamErrorKind;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading the content through the hasher failed.
    #[display("can't hash content")]
    Hash,
    /// Checking whether the target already exists failed for a reason other
    /// than it not existing.
    #[display("can't check file status: {}", _0.display())]
    Stat(#[error(not(source))] PathBuf),
    /// The staging file could not be created in the destination directory.
    #[display("can't create file for: {}", _0.display())]
    Create(#[error(not(source))] PathBuf),
    /// Copying content into the staging file failed.
    #[display("can't write content for: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// Moving the staging file to its final name failed.
    #[display("can't move file into place: {}", _0.display())]
    Persist(#[error(not(source))] PathBuf),
    /// A leftover staging file could not be deleted.
    #[display("can't remove file: {}", _0.display())]
    Remove(#[error(not(source))] PathBuf),
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Destination directory is relative, or exists but is not a directory.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Extension or stored name would escape the destination directory.
    #[display("invalid extension: {_0:?}")]
    InvalidExtension(#[error(not(source))] String),
    /// The caller's stream could not be read or repositioned.
    #[display("stream error: {_0}")]
    Position(#[error(not(source))] StreamErrorKind),
}
impl From<StreamErrorKind> for ErrorKind {
    fn from(kind: StreamErrorKind) -> Self {
        Self::Position(kind)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Hash | Self::Stat(_) | Self::Create(_) | Self::Write(_) | Self::Persist(_) | Self::Remove(_) => true,
            Self::Position(kind) => kind.is_retryable(),
            Self::NotFound(_) | Self::PermissionDenied(_) | Self::InvalidPath(_) | Self::InvalidExtension(_) => false,
        }
    }

    pub(crate) fn from_io(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Stat(path.into()),
        }
    }
}
