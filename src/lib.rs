//! Content-addressed upload ingestion.
//!
//! An upload is sniffed against an allow-list of MIME types, stored once per
//! distinct content under its BLAKE3 identifier, and recorded in SQLite inside
//! a unit of work that commits only when everything before it succeeded.

pub mod error;
mod ingest;
mod request;

pub use crate::ingest::{Identification, Ingestor, Upload, extension_for, identify};
pub use crate::request::RequestId;
