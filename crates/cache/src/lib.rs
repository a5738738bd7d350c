//! SQLite metadata for ingested uploads.
//!
//! Every accepted upload gets one row, even when its content was already on
//! disk; many rows may point at the same stored file. Writes happen inside a
//! [`tx::Transaction`] and are settled through [`tx::finalize`] (or the scoped
//! [`tx::unit_of_work`]), which commits on success and rolls back on failure
//! without ever dropping either error.

mod db;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod models;
mod repo;
pub mod tx;

pub use crate::db::{Database, SqliteTransaction};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::{Call, MockTransaction};
pub use crate::models::{NewUpload, Upload};
pub use crate::repo::Repository;
pub use crate::tx::{Finalized, Transaction, finalize, unit_of_work};
