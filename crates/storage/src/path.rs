//! Name validation.
//!
//! Stored names are joined onto the destination directory, so neither the
//! extension nor a name handed back by a caller may smuggle in separators,
//! traversal or NUL bytes.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Validates an extension to be appended verbatim to a content identifier.
///
/// Any extension is accepted, leading separator or not, as long as the
/// resulting name stays a single component of the destination directory:
/// no `/`, no `\` and no NUL.
///
/// # Examples
///
/// ```
/// use hoard_storage::validate_extension;
/// assert!(validate_extension("").is_ok());
/// assert!(validate_extension(".png").is_ok());
/// assert!(validate_extension("png").is_ok());
/// assert!(validate_extension(".jpeg2000~").is_ok());
/// assert!(validate_extension("./../x").is_err());
/// assert!(validate_extension(".a/b").is_err());
/// ```
pub fn validate_extension(extension: &str) -> Result<&str> {
    // Identifiers are never empty, so any leading character stands in.
    let escapes = extension.contains(['/', '\\', '\0']) || validate_name(&format!("0{extension}")).is_err();
    if escapes {
        exn::bail!(ErrorKind::InvalidExtension(extension.to_string()));
    }
    Ok(extension)
}

/// Validates a stored name: a single, normal path component.
pub fn validate_name(name: &str) -> Result<&Path> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        // Null bytes pass through Path::components() on Unix but cause
        // truncation in C-based syscalls; reject them explicitly.
        (Some(Component::Normal(s)), None) if !s.as_encoded_bytes().contains(&0) => Ok(path),
        _ => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
    }
}
