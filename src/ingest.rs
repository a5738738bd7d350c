//! The ingest pipeline: sniff, store, record.

use crate::error::{ErrorKind, Result};
use crate::request::RequestId;
use exn::ResultExt;
use hoard_cache::{Database, NewUpload, Repository, SqliteTransaction, unit_of_work};
use hoard_sniff::Classification;
use hoard_storage::{ContentStore, StoredFile, compute_identifier};
use std::io::{Read, Seek};

/// Extension (leading dot included) that stored files of a detected type get.
/// Parameters are ignored; unknown types get no extension.
pub fn extension_for(mime: &str) -> &'static str {
    let essence = mime.split_once(';').map_or(mime, |(essence, _)| essence).trim();
    match essence {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/x-icon" => ".ico",
        "application/pdf" => ".pdf",
        "application/postscript" => ".ps",
        "application/zip" => ".zip",
        "application/x-gzip" => ".gz",
        "application/x-rar-compressed" => ".rar",
        "application/wasm" => ".wasm",
        "application/ogg" => ".ogg",
        "application/vnd.ms-fontobject" => ".eot",
        "audio/mpeg" => ".mp3",
        "audio/wave" => ".wav",
        "audio/aiff" => ".aiff",
        "audio/midi" => ".mid",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "video/avi" => ".avi",
        "font/ttf" => ".ttf",
        "font/otf" => ".otf",
        "font/woff" => ".woff",
        "font/woff2" => ".woff2",
        "font/collection" => ".ttc",
        "text/html" => ".html",
        "text/xml" => ".xml",
        "text/plain" => ".txt",
        _ => "",
    }
}

/// An accepted and recorded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Row id of the metadata record.
    pub id: i64,
    pub request_id: RequestId,
    pub mime: &'static str,
    pub stored: StoredFile,
}

/// What [`identify`] found out about a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    /// Content-addressed name the stream would be stored under.
    pub name: String,
    pub classification: Classification,
}

/// Classify and name `stream` without storing anything.
pub fn identify<R, S>(stream: &mut R, allowed: &[S]) -> Result<Identification>
where
    R: Read + Seek + ?Sized,
    S: AsRef<str>,
{
    let classification = hoard_sniff::inspect(stream, allowed).or_raise(|| ErrorKind::Stream)?;
    let name = compute_identifier(stream, extension_for(classification.detected)).or_raise(|| ErrorKind::Storage)?;
    Ok(Identification { name, classification })
}

/// Composes the type gate, the content store and the metadata database.
#[derive(Debug, Clone)]
pub struct Ingestor {
    store: ContentStore,
    db: Database,
    repo: Repository,
    allowed: Vec<String>,
}

impl Ingestor {
    pub fn new<S: Into<String>>(store: ContentStore, db: Database, allowed: impl IntoIterator<Item = S>) -> Self {
        let repo = Repository::from(&db);
        let allowed = allowed.into_iter().map(Into::into).collect();
        Self { store, db, repo, allowed }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Accept `stream` if its sniffed type is allowed, store it once per
    /// distinct content, and record the upload.
    ///
    /// Storage and the metadata insert form one unit of work: the row is
    /// committed only if both succeed. A stored file is never removed again,
    /// so a failed insert can leave content on disk without a row; the next
    /// upload of the same content reuses it.
    ///
    /// The stream is handed back at its original position.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Rejected`] for a type outside the allow-list; every other
    /// kind is a server-side failure.
    #[tracing::instrument(name = "ingest", skip_all, fields(request_id = %request_id))]
    pub async fn ingest<R>(&self, request_id: RequestId, original_name: Option<&str>, mut stream: R) -> Result<(Upload, R)>
    where
        R: Read + Seek + Send + 'static,
    {
        let mime = hoard_sniff::classify(&mut stream, &self.allowed).map_err(|err| {
            let kind = err.detected().map_or(ErrorKind::Stream, ErrorKind::Rejected);
            err.raise(kind)
        })?;
        let extension = extension_for(mime);
        let store = self.store.clone();
        let tx = self.db.begin().await.or_raise(|| ErrorKind::Database)?;

        let (upload, stream) = unit_of_work(tx, async move |tx: &mut SqliteTransaction| -> Result<(Upload, R)> {
            // Hashing and copying are blocking file I/O.
            let (stored, stream) = tokio::task::spawn_blocking(move || {
                let mut stream = stream;
                let stored = store.save(&mut stream, extension);
                (stored, stream)
            })
            .await
            .or_raise(|| ErrorKind::Runtime)?;
            let stored = stored.or_raise(|| ErrorKind::Storage)?;

            let row = NewUpload {
                request_id: request_id.get(),
                original_name: original_name.map(str::to_owned),
                identifier: stored.identifier.clone(),
                extension: stored.extension.clone(),
                mime_type: mime.to_string(),
                size: stored.size,
                stored_path: stored.path.clone(),
            };
            let id = self.repo.insert_upload(tx, &row).await.or_raise(|| ErrorKind::Database)?;
            Ok((Upload { id, request_id, mime, stored }, stream))
        })
        .await?;

        tracing::info!(
            id = upload.id,
            identifier = %upload.stored.identifier,
            created = upload.stored.created,
            mime,
            "upload ingested"
        );
        Ok((upload, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{Cursor, SeekFrom};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00\x00\x0DIHDR\x00\x00\x00\x01\x00\x00\x00\x01";
    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00";

    async fn setup(allowed: &[&str]) -> (TempDir, Ingestor) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("objects")).unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        (dir, Ingestor::new(store, db, allowed.iter().copied()))
    }

    fn stored_files(directory: &Path) -> usize {
        std::fs::read_dir(directory).unwrap().count()
    }

    #[rstest]
    #[case("image/png", ".png")]
    #[case("image/jpeg", ".jpg")]
    #[case("text/plain; charset=utf-8", ".txt")]
    #[case("text/html; charset=utf-8", ".html")]
    #[case("application/octet-stream", "")]
    #[case("application/x-unheard-of", "")]
    fn test_extension_for(#[case] mime: &str, #[case] extension: &str) {
        assert_eq!(extension_for(mime), extension);
    }

    #[tokio::test]
    async fn test_ingest_stores_and_records() {
        let (_dir, ingestor) = setup(&["image/png"]).await;
        let (upload, stream) = ingestor
            .ingest(RequestId::new(7), Some("cat.png"), Cursor::new(PNG.to_vec()))
            .await
            .unwrap();

        assert_eq!(upload.mime, "image/png");
        assert!(upload.stored.created);
        assert_eq!(upload.stored.extension, ".png");
        assert_eq!(std::fs::read(&upload.stored.path).unwrap(), PNG);
        assert_eq!(stream.position(), 0);

        let row = ingestor.repository().get(upload.id).await.unwrap();
        assert_eq!(row.request_id, 7);
        assert_eq!(row.original_name.as_deref(), Some("cat.png"));
        assert_eq!(row.identifier, upload.stored.identifier);
        assert_eq!(row.mime_type, "image/png");
        assert_eq!(row.stored_path, upload.stored.path);
    }

    #[tokio::test]
    async fn test_duplicate_content_is_stored_once() {
        let (_dir, ingestor) = setup(&["image/png"]).await;
        let (first, _) = ingestor.ingest(RequestId::new(1), None, Cursor::new(PNG.to_vec())).await.unwrap();
        let (second, _) = ingestor.ingest(RequestId::new(2), None, Cursor::new(PNG.to_vec())).await.unwrap();

        assert!(first.stored.created);
        assert!(!second.stored.created);
        assert_eq!(first.stored.path, second.stored.path);
        assert_eq!(stored_files(ingestor.store().directory()), 1);
        // One row per upload, both pointing at the same file.
        assert_eq!(ingestor.repository().by_identifier(&first.stored.identifier).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingests_on_spawned_tasks() {
        let (_dir, ingestor) = setup(&["image/png"]).await;
        let ingestor = Arc::new(ingestor);
        let tasks: Vec<_> = (0..8u32)
            .map(|n| {
                let ingestor = Arc::clone(&ingestor);
                tokio::spawn(async move { ingestor.ingest(RequestId::new(n), None, Cursor::new(PNG.to_vec())).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            let (upload, _) = task.await.unwrap().unwrap();
            created += usize::from(upload.stored.created);
        }
        assert_eq!(created, 1);
        assert_eq!(stored_files(ingestor.store().directory()), 1);
        assert_eq!(ingestor.repository().count().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_stream_is_returned_at_its_position() {
        let (_dir, ingestor) = setup(&["image/png"]).await;
        let mut data = b"junk".to_vec();
        data.extend_from_slice(PNG);
        let mut stream = Cursor::new(data);
        stream.seek(SeekFrom::Start(4)).unwrap();

        let (upload, stream) = ingestor.ingest(RequestId::new(1), None, stream).await.unwrap();
        assert_eq!(stream.position(), 4);
        assert_eq!(upload.stored.size, PNG.len() as u64);
    }

    #[tokio::test]
    async fn test_rejection_stores_nothing() {
        let (_dir, ingestor) = setup(&["image/png"]).await;
        let err = ingestor.ingest(RequestId::new(1), None, Cursor::new(JPEG.to_vec())).await.unwrap_err();

        assert_eq!(*err, ErrorKind::Rejected("image/jpeg"));
        assert!(err.is_client_error());
        assert_eq!(stored_files(ingestor.store().directory()), 0);
        assert_eq!(ingestor.repository().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_needs_explicit_allow() {
        let (_dir, ingestor) = setup(&["image/png"]).await;
        let err = ingestor.ingest(RequestId::new(1), None, Cursor::new(Vec::new())).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Rejected("application/octet-stream"));

        let (_dir, ingestor) = setup(&["application/octet-stream"]).await;
        let (upload, _) = ingestor.ingest(RequestId::new(1), None, Cursor::new(Vec::new())).await.unwrap();
        assert_eq!(upload.stored.extension, "");
        assert_eq!(upload.stored.size, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_records_nothing() {
        let (_dir, ingestor) = setup(&["image/png"]).await;
        std::fs::remove_dir(ingestor.store().directory()).unwrap();

        let err = ingestor.ingest(RequestId::new(1), None, Cursor::new(PNG.to_vec())).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Storage);
        assert!(!err.is_client_error());
        assert_eq!(ingestor.repository().count().await.unwrap(), 0);
    }

    #[test]
    fn test_identify_does_not_store() {
        let mut stream = Cursor::new(PNG.to_vec());
        let found = identify(&mut stream, &["image/jpeg"]).unwrap();
        assert_eq!(found.classification, Classification { detected: "image/png", accepted: false });
        assert!(found.name.ends_with(".png"));
        assert_eq!(found.name.len(), hoard_storage::IDENTIFIER_LEN + ".png".len());
        assert_eq!(stream.position(), 0);
    }
}
