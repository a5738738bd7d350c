//! Content-type sniffing and allow-list enforcement.
//!
//! Uploads are classified by their leading bytes, never by the filename or a
//! client-supplied header. [`detect`] is a pure function over a header buffer;
//! [`inspect`] and [`classify`] read the first [`SNIFF_LEN`] bytes from a
//! caller-owned stream and leave its read position untouched.

mod detect;
pub mod error;
mod gate;

pub use crate::detect::{OCTET_STREAM, SNIFF_LEN, detect};
pub use crate::gate::{Classification, classify, inspect};
