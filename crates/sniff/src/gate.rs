use crate::detect::{SNIFF_LEN, detect};
use crate::error::{ErrorKind, Result};
use hoard_stream::RewindExt;
use hoard_stream::error::lift;
use std::io::{Read, Seek};

/// Outcome of sniffing a stream against an allow-list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub detected: &'static str,
    pub accepted: bool,
}

/// Sniff the first [`SNIFF_LEN`] bytes of `stream` and report whether the
/// detected type is in `allowed`. Never rejects; see [`classify`] for that.
///
/// Matching is exact, parameters included (`text/plain; charset=utf-8` is
/// not `text/plain`). The stream's read position is unchanged afterwards.
pub fn inspect<R, S>(stream: &mut R, allowed: &[S]) -> Result<Classification>
where
    R: Read + Seek + ?Sized,
    S: AsRef<str>,
{
    let header = stream.peek(SNIFF_LEN).map_err(lift::<ErrorKind>)?;
    let detected = detect(&header);
    let accepted = allowed.iter().any(|candidate| candidate.as_ref() == detected);
    Ok(Classification { detected, accepted })
}

/// Sniff `stream` and refuse anything not in `allowed`.
///
/// Returns the detected type on success. A refusal is
/// [`ErrorKind::Rejected`], which still carries the detected type. An empty
/// stream is [`OCTET_STREAM`](crate::OCTET_STREAM) and only passes if the
/// caller lists it explicitly.
///
/// # Examples
///
/// ```
/// use hoard_sniff::classify;
/// use hoard_sniff::error::ErrorKind;
/// use std::io::Cursor;
///
/// let mut png = Cursor::new(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec());
/// assert_eq!(classify(&mut png, &["image/png"]).unwrap(), "image/png");
///
/// let err = classify(&mut png, &["image/jpeg"]).unwrap_err();
/// assert_eq!(*err, ErrorKind::Rejected("image/png"));
/// assert_eq!(png.position(), 0);
/// ```
pub fn classify<R, S>(stream: &mut R, allowed: &[S]) -> Result<&'static str>
where
    R: Read + Seek + ?Sized,
    S: AsRef<str>,
{
    let Classification { detected, accepted } = inspect(stream, allowed)?;
    if !accepted {
        tracing::debug!(detected, "content type not on allow-list");
        exn::bail!(ErrorKind::Rejected(detected));
    }
    Ok(detected)
}
