//! Upload metadata repository.
//!
//! Writes take an explicit connection so they run inside whatever transaction
//! the caller has open; reads go straight to the pool.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{NewUpload, Upload, UploadRow};
use exn::{OptionExt, ResultExt};
use sqlx::{SqliteConnection, SqlitePool};
use time::UtcDateTime;

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an upload on `conn`, returning its row id.
    ///
    /// Pass the connection of an open transaction (`&mut *tx`) to make the
    /// insert part of a unit of work.
    #[tracing::instrument(level = "debug", skip_all, fields(request_id = upload.request_id, identifier = %upload.identifier))]
    pub async fn insert_upload(&self, conn: &mut SqliteConnection, upload: &NewUpload) -> Result<i64> {
        let row = UploadRow::insertable(upload, UtcDateTime::now())?;
        sqlx::query_scalar(include_str!("../queries/insert_upload.sql"))
            .bind(row.request_id)
            .bind(row.original_name)
            .bind(row.identifier)
            .bind(row.extension)
            .bind(row.mime_type)
            .bind(row.size)
            .bind(row.stored_path)
            .bind(row.created_at)
            .fetch_one(conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Get an upload by row id.
    pub async fn get(&self, id: i64) -> Result<Upload> {
        let row: Option<UploadRow> = sqlx::query_as(include_str!("../queries/get_upload.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.ok_or_raise(|| ErrorKind::UploadNotFound(id))?.try_into()
    }

    /// All uploads whose content hashed to `identifier`, oldest first.
    pub async fn by_identifier(&self, identifier: impl AsRef<str>) -> Result<Vec<Upload>> {
        let rows: Vec<UploadRow> = sqlx::query_as(include_str!("../queries/get_by_identifier.sql"))
            .bind(identifier.as_ref())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Upload::try_from).collect()
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_uploads.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }
}
