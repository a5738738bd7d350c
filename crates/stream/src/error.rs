//! Stream Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A stream positioning error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for stream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Kinds are fieldless (the underlying [`std::io::Error`] lives in the error
/// tree) so that downstream crates can embed them in their own kinds.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The current offset could not be determined.
    #[display("can't determine stream position")]
    Tell,
    /// The stream could not be repositioned.
    #[display("can't seek stream")]
    Seek,
    /// Reading from the stream failed.
    #[display("can't read stream")]
    Read,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Read)
    }
}

/// Raise a stream error into a downstream error type, keeping the original
/// frame as a child in the new error tree.
#[track_caller]
pub fn lift<E>(err: Error) -> exn::Exn<E>
where
    E: From<ErrorKind> + std::error::Error + Send + Sync + 'static,
{
    let kind = *err;
    err.raise(E::from(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Tell.to_string(), "can't determine stream position");
        assert_eq!(ErrorKind::Seek.to_string(), "can't seek stream");
        assert_eq!(ErrorKind::Read.to_string(), "can't read stream");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Read.is_retryable());
        assert!(!ErrorKind::Seek.is_retryable());
        assert!(!ErrorKind::Tell.is_retryable());
    }

    #[test]
    fn lift_keeps_kind() {
        #[derive(Debug, Display, Error)]
        enum Outer {
            #[display("positioning")]
            Position(#[error(not(source))] ErrorKind),
        }
        impl From<ErrorKind> for Outer {
            fn from(kind: ErrorKind) -> Self {
                Self::Position(kind)
            }
        }

        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        let err = result.or_raise(|| ErrorKind::Seek).unwrap_err();
        let lifted: exn::Exn<Outer> = lift(err);
        assert!(matches!(*lifted, Outer::Position(ErrorKind::Seek)));
    }
}
