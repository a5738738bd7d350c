//! Content-addressed storage for uploaded files.
//!
//! A file's name is the BLAKE3 hash of its content plus a caller-supplied
//! extension, so identical uploads land on the same name and are only ever
//! written once:
//!
//! - [`compute_identifier`] hashes a stream without moving its read position.
//! - [`ContentStore`] (or the free function [`save`]) places the content in a
//!   destination directory exactly once per distinct content and extension.

mod address;
pub mod error;
mod models;
mod path;
mod store;

pub use crate::address::{IDENTIFIER_LEN, compute_identifier};
pub use crate::models::StoredFile;
pub use crate::path::{validate_extension, validate_name};
pub use crate::store::{ContentStore, save};
