//! Ingest Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The detected content type is not on the allow-list.
    #[display("content type not permitted: {_0}")]
    Rejected(#[error(not(source))] &'static str),
    /// The upload itself could not be read.
    #[display("could not read upload")]
    Stream,
    #[display("storage error")]
    Storage,
    #[display("database error")]
    Database,
    /// A blocking task panicked or was cancelled.
    #[display("runtime error")]
    Runtime,
}

impl ErrorKind {
    /// Whether the failure is the uploader's fault rather than the server's.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Runtime)
    }
}

// Transaction outcomes surface in the caller's kind.
impl From<hoard_cache::error::ErrorKind> for ErrorKind {
    fn from(_: hoard_cache::error::ErrorKind) -> Self {
        Self::Database
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejections_are_client_errors() {
        assert!(ErrorKind::Rejected("image/png").is_client_error());
        assert!(!ErrorKind::Stream.is_client_error());
        assert!(!ErrorKind::Storage.is_client_error());
        assert!(!ErrorKind::Database.is_client_error());
    }

    #[tokio::test]
    async fn test_panicked_blocking_task_is_a_retryable_runtime_error() {
        use exn::ResultExt;

        let err = tokio::task::spawn_blocking(|| -> u8 { panic!("storage task") })
            .await
            .or_raise(|| ErrorKind::Runtime)
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Runtime);
        assert!(err.is_retryable());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::Rejected("image/png").to_string(), "content type not permitted: image/png");
    }
}
