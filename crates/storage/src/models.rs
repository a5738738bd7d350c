//! Storage models.

use std::path::PathBuf;

/// Where a piece of content ended up.
///
/// Derived on demand by [`save`](crate::save); never persisted by this crate.
/// The same content saved twice yields two equal records apart from
/// `created`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Lowercase hex BLAKE3 digest of the content.
    pub identifier: String,
    /// Extension appended verbatim to the identifier.
    pub extension: String,
    /// Destination directory.
    pub directory: PathBuf,
    /// `directory` joined with [`name()`](Self::name).
    pub path: PathBuf,
    /// Content size in bytes.
    pub size: u64,
    /// Whether this call wrote the file. `false` when it already existed,
    /// including when a concurrent writer placed it first.
    pub created: bool,
}

impl StoredFile {
    /// File name inside the destination directory.
    pub fn name(&self) -> String {
        format!("{}{}", self.identifier, self.extension)
    }
}
