use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use std::path::PathBuf;
use time::UtcDateTime;

/// An upload about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpload {
    pub request_id: u32,
    /// Client-supplied file name, kept for display only.
    pub original_name: Option<String>,
    pub identifier: String,
    pub extension: String,
    pub mime_type: String,
    pub size: u64,
    pub stored_path: PathBuf,
}

/// A recorded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub id: i64,
    pub request_id: u32,
    pub original_name: Option<String>,
    pub identifier: String,
    pub extension: String,
    pub mime_type: String,
    pub size: u64,
    pub stored_path: PathBuf,
    pub created_at: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct UploadRow {
    pub(crate) id: i64,
    pub(crate) request_id: i64,
    pub(crate) original_name: Option<String>,
    pub(crate) identifier: String,
    pub(crate) extension: String,
    pub(crate) mime_type: String,
    pub(crate) size: i64,
    pub(crate) stored_path: String,
    pub(crate) created_at: i64,
}

impl UploadRow {
    pub(crate) fn insertable(upload: &NewUpload, created_at: UtcDateTime) -> Result<Self, Error> {
        Ok(Self {
            id: 0,
            request_id: i64::from(upload.request_id),
            original_name: upload.original_name.clone(),
            identifier: upload.identifier.clone(),
            extension: upload.extension.clone(),
            mime_type: upload.mime_type.clone(),
            size: i64::try_from(upload.size).or_raise(|| ErrorKind::InvalidData("size"))?,
            stored_path: upload
                .stored_path
                .to_str()
                .ok_or_raise(|| ErrorKind::InvalidData("stored path"))?
                .to_string(),
            created_at: created_at.unix_timestamp(),
        })
    }
}

impl TryFrom<UploadRow> for Upload {
    type Error = Error;
    fn try_from(row: UploadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            request_id: u32::try_from(row.request_id).or_raise(|| ErrorKind::InvalidData("request id"))?,
            original_name: row.original_name,
            identifier: row.identifier,
            extension: row.extension,
            mime_type: row.mime_type,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("size"))?,
            stored_path: PathBuf::from(row.stored_path),
            created_at: UtcDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::InvalidData("creation date"))?,
        })
    }
}
