//! Content-addressed placement on the local filesystem.

use crate::address::fingerprint;
use crate::error::{ErrorKind, Result};
use crate::models::StoredFile;
use crate::path::{validate_extension, validate_name};
use exn::ResultExt;
use hoard_stream::RewindExt;
use std::fs::{self, File, create_dir_all};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::{Builder, NamedTempFile};

/// Staging files share the destination directory so the final rename never
/// crosses a filesystem boundary.
const STAGING_PREFIX: &str = ".hoard-";
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;
/// Staging files this old were abandoned by a crash, not still being written.
pub const STALE_STAGING_AGE: Duration = Duration::from_secs(60 * 60);

/// A destination directory holding one file per distinct content.
///
/// # Examples
///
/// ```no_run
/// use hoard_storage::ContentStore;
/// use std::fs::File;
///
/// let store = ContentStore::new("/srv/uploads/avatars").unwrap();
/// let mut upload = File::open("/tmp/upload.png").unwrap();
/// let stored = store.save(&mut upload, ".png").unwrap();
/// println!("{} -> {}", stored.name(), stored.path.display());
/// ```
#[derive(Clone, Debug)]
pub struct ContentStore {
    directory: PathBuf,
}

impl ContentStore {
    /// Open (creating if necessary) a store rooted at `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or exists but isn't a directory.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(directory));
        }
        if directory.exists() {
            if !directory.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(directory));
            }
        } else {
            create_dir_all(&directory).or_raise(|| ErrorKind::Create(directory.clone()))?;
        }
        let store = Self { directory };
        if let Err(err) = store.sweep_staging(STALE_STAGING_AGE) {
            tracing::warn!(error = ?err, "could not sweep stale staging files");
        }
        Ok(store)
    }

    /// Delete staging files left behind by interrupted saves.
    ///
    /// Only files at least `max_age` old are removed, so saves in flight in
    /// other processes sharing the directory are left alone. Returns how many
    /// files were removed.
    pub fn sweep_staging(&self, max_age: Duration) -> Result<usize> {
        let entries = fs::read_dir(&self.directory).or_raise(|| ErrorKind::Stat(self.directory.clone()))?;
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries {
            let entry = entry.or_raise(|| ErrorKind::Stat(self.directory.clone()))?;
            if !entry.file_name().as_encoded_bytes().starts_with(STAGING_PREFIX.as_bytes()) {
                continue;
            }
            let path = entry.path();
            let metadata = entry.metadata().or_raise(|| ErrorKind::Stat(path.clone()))?;
            let age = metadata.modified().ok().and_then(|modified| now.duration_since(modified).ok());
            if !metadata.is_file() || !age.is_some_and(|age| age >= max_age) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // Placed or swept by someone else in the meantime.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => return Err(e).or_raise(|| ErrorKind::Remove(path)),
            }
        }
        if removed > 0 {
            tracing::info!(removed, directory = %self.directory.display(), "removed stale staging files");
        }
        Ok(removed)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full path a given identifier and extension would be stored at.
    pub fn path_for(&self, identifier: &str, extension: &str) -> Result<PathBuf> {
        let name = format!("{identifier}{}", validate_extension(extension)?);
        Ok(self.directory.join(validate_name(&name)?))
    }

    /// Whether content with this identifier and extension is already stored.
    pub fn contains(&self, identifier: &str, extension: &str) -> Result<bool> {
        let path = self.path_for(identifier, extension)?;
        path.try_exists().or_raise(|| ErrorKind::Stat(path.clone()))
    }

    /// Open a stored file for reading by its name (identifier + extension).
    pub fn open(&self, name: &str) -> Result<File> {
        let path = self.directory.join(validate_name(name)?);
        File::open(&path).map_err(|e| {
            let kind = ErrorKind::from_io(&e, &path);
            exn::Exn::from(e).raise(kind)
        })
    }

    /// Store the content of `stream` under its content-addressed name.
    ///
    /// See [`save`].
    pub fn save<R: Read + Seek + ?Sized>(&self, stream: &mut R, extension: &str) -> Result<StoredFile> {
        save(stream, extension, &self.directory)
    }
}

/// Store everything from the stream's current position to its end in
/// `directory`, named by content hash plus `extension`.
///
/// If a file with that name already exists nothing is written. Otherwise the
/// content is staged in a temporary file next to its final name, synced, and
/// moved into place with an atomic no-clobber rename: a reader never sees a
/// partial file under the final name, and if a concurrent caller placed the
/// same content first, this call discards its copy and still succeeds.
///
/// The stream is returned to its starting position on every path.
///
/// # Errors
///
/// - [`InvalidExtension`](ErrorKind::InvalidExtension) before any I/O.
/// - [`Position`](ErrorKind::Position) / [`Hash`](ErrorKind::Hash) from hashing.
/// - [`Stat`](ErrorKind::Stat) if existence can't be determined.
/// - [`Create`](ErrorKind::Create), [`Write`](ErrorKind::Write) or
///   [`Persist`](ErrorKind::Persist) while placing a new file.
#[tracing::instrument(level = "debug", skip(stream, directory), fields(directory = %directory.display()))]
pub fn save<R: Read + Seek + ?Sized>(stream: &mut R, extension: &str, directory: &Path) -> Result<StoredFile> {
    validate_extension(extension)?;
    stream.rewinding(|stream| {
        let (digest, size) = stream.rewinding(|stream| fingerprint(stream))?;
        let identifier = digest.to_hex().to_string();
        let path = directory.join(format!("{identifier}{extension}"));

        let created = match fs::metadata(&path) {
            Ok(_) => {
                tracing::debug!(path = %path.display(), "content already stored");
                false
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => place(stream, directory, &path)?,
            Err(e) => return Err(e).or_raise(|| ErrorKind::Stat(path.clone())),
        };

        Ok(StoredFile {
            identifier,
            extension: extension.to_string(),
            directory: directory.to_path_buf(),
            path,
            size,
            created,
        })
    })
}

/// Stage the stream into `directory` and link it to `target` unless someone
/// beat us to it. Returns whether this call placed the file.
fn place<R: Read + ?Sized>(stream: &mut R, directory: &Path, target: &Path) -> Result<bool> {
    let mut staged = staging_file(directory).or_raise(|| ErrorKind::Create(target.to_path_buf()))?;
    io::copy(stream, &mut staged).or_raise(|| ErrorKind::Write(target.to_path_buf()))?;
    staged.as_file().sync_all().or_raise(|| ErrorKind::Write(target.to_path_buf()))?;

    match staged.persist_noclobber(target) {
        Ok(_) => {
            tracing::debug!(path = %target.display(), "content stored");
            Ok(true)
        },
        // Lost the race to an identical upload. Dropping the returned
        // staging file deletes it.
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %target.display(), "content stored concurrently by another caller");
            Ok(false)
        },
        Err(e) => Err(e.error).or_raise(|| ErrorKind::Persist(target.to_path_buf())),
    }
}

fn staging_file(directory: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(STAGING_PREFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(FILE_MODE));
    }
    builder.tempfile_in(directory)
}
