use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use hoard_stream::RewindExt;
use std::io::{self, Read, Seek};

/// Length of a content identifier: a hex-encoded 256-bit BLAKE3 digest.
pub const IDENTIFIER_LEN: usize = blake3::OUT_LEN * 2;

/// Hash and size of everything from the current position to the end of the
/// stream. Advances the stream.
pub(crate) fn fingerprint<R: Read + ?Sized>(stream: &mut R) -> Result<(blake3::Hash, u64)> {
    let mut hasher = blake3::Hasher::new();
    let size = io::copy(stream, &mut hasher).or_raise(|| ErrorKind::Hash)?;
    Ok((hasher.finalize(), size))
}

/// Compute the content-addressed name for everything from the stream's
/// current position to its end.
///
/// The name is the lowercase hex BLAKE3 digest with `extension` appended
/// verbatim. Identical bytes always produce identical names. The stream is
/// returned to where it started, on success and on failure.
///
/// # Errors
///
/// - [`ErrorKind::Position`] if the offset can't be read or restored.
/// - [`ErrorKind::Hash`] if reading fails part-way through.
///
/// # Examples
///
/// ```
/// use hoard_storage::compute_identifier;
/// use std::io::Cursor;
///
/// let mut stream = Cursor::new(b"hello".to_vec());
/// let name = compute_identifier(&mut stream, ".txt").unwrap();
/// assert_eq!(name, format!("{}.txt", blake3::hash(b"hello")));
/// assert_eq!(stream.position(), 0);
/// ```
pub fn compute_identifier<R: Read + Seek + ?Sized>(stream: &mut R, extension: &str) -> Result<String> {
    let (digest, _) = stream.rewinding(|stream| fingerprint(stream))?;
    Ok(format!("{}{extension}", digest.to_hex()))
}
