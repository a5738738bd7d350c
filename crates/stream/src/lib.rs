//! Non-destructive inspection of seekable byte streams.
//!
//! Uploaded content arrives as a caller-owned [`Read`](std::io::Read) +
//! [`Seek`](std::io::Seek) stream. Hashing it or sniffing its header must not
//! move the caller's read position, so every inspection in this workspace goes
//! through [`RewindExt::rewinding`], which snapshots the offset with a
//! [`Checkpoint`] and puts it back on every exit path.

pub mod error;
mod rewind;

pub use crate::rewind::{Checkpoint, RewindExt};
