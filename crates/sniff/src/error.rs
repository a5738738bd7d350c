//! Sniffing Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use hoard_stream::error::ErrorKind as StreamErrorKind;

/// A sniffing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sniffing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The detected content type is not on the allow-list. This is the
    /// client's fault; map it to a rejection, not a server fault.
    #[display("content type not permitted: {_0}")]
    Rejected(#[error(not(source))] &'static str),
    /// The stream could not be read or repositioned.
    #[display("stream error: {_0}")]
    Stream(#[error(not(source))] StreamErrorKind),
}
impl From<StreamErrorKind> for ErrorKind {
    fn from(kind: StreamErrorKind) -> Self {
        Self::Stream(kind)
    }
}

impl ErrorKind {
    /// Returns `true` if the input itself was refused.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns the detected type carried by a rejection.
    pub fn detected(&self) -> Option<&'static str> {
        match self {
            Self::Rejected(detected) => Some(detected),
            Self::Stream(_) => None,
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected(_) => false,
            Self::Stream(kind) => kind.is_retryable(),
        }
    }
}
