//! Offset snapshots and the rewind-on-every-exit idiom.

use crate::error::{ErrorKind, Result, lift};
use exn::ResultExt;
use std::io::{Read, Seek, SeekFrom};

/// A recorded absolute stream offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    offset: u64,
}

impl Checkpoint {
    /// Record the current offset of `stream`.
    pub fn capture<S: Seek + ?Sized>(stream: &mut S) -> Result<Self> {
        let offset = stream.stream_position().or_raise(|| ErrorKind::Tell)?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Seek `stream` back to the recorded offset.
    pub fn restore<S: Seek + ?Sized>(&self, stream: &mut S) -> Result<()> {
        stream.seek(SeekFrom::Start(self.offset)).or_raise(|| ErrorKind::Seek)?;
        Ok(())
    }
}

/// Inspection helpers for anything [`Seek`]able.
///
/// Implemented for every `S: Seek`, including unsized trait objects.
pub trait RewindExt: Seek {
    /// Run `op` against the stream and put the read position back where it
    /// was, whether `op` succeeds or not.
    ///
    /// - Capturing the starting offset fails: `op` never runs.
    /// - `op` fails: restoring is still attempted, and `op`'s error wins.
    /// - `op` succeeds but restoring fails: the restore error is returned,
    ///   because the caller's stream is now somewhere unexpected.
    ///
    /// Stream errors are raised into the caller's error type `E` through its
    /// `From<ErrorKind>` implementation.
    ///
    /// # Examples
    ///
    /// ```
    /// use hoard_stream::RewindExt;
    /// use hoard_stream::error::ErrorKind;
    /// use exn::ResultExt;
    /// use std::io::{Cursor, Read, Seek};
    ///
    /// let mut stream = Cursor::new(b"0123456789".to_vec());
    /// stream.set_position(4);
    /// let rest = stream
    ///     .rewinding(|s| {
    ///         let mut rest = Vec::new();
    ///         s.read_to_end(&mut rest).or_raise(|| ErrorKind::Read)?;
    ///         Ok::<_, exn::Exn<ErrorKind>>(rest)
    ///     })
    ///     .unwrap();
    /// assert_eq!(rest, b"456789");
    /// assert_eq!(stream.stream_position().unwrap(), 4);
    /// ```
    fn rewinding<T, E, F>(&mut self, op: F) -> std::result::Result<T, exn::Exn<E>>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, exn::Exn<E>>,
        E: From<ErrorKind> + std::error::Error + Send + Sync + 'static,
    {
        let checkpoint = Checkpoint::capture(self).map_err(lift::<E>)?;
        let outcome = op(self);
        let restored = checkpoint.restore(self);
        match (outcome, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(lift::<E>(e)),
            // Best effort only: the operation's own error is more useful.
            (Err(e), _) => Err(e),
        }
    }

    /// Read up to `limit` bytes from the current position without consuming
    /// them.
    ///
    /// Returns fewer bytes when the stream ends first; an exhausted stream
    /// returns an empty buffer.
    fn peek(&mut self, limit: usize) -> Result<Vec<u8>>
    where
        Self: Read,
    {
        self.rewinding(|stream| {
            let mut head = Vec::with_capacity(limit);
            (&mut *stream).take(limit as u64).read_to_end(&mut head).or_raise(|| ErrorKind::Read)?;
            Ok(head)
        })
    }
}

impl<S: Seek + ?Sized> RewindExt for S {}
