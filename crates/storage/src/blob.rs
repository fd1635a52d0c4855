//! File-per-collection blob storage
//!
//! Each collection persists as one JSON object file inside the data
//! directory, named by the percent-encoded collection id plus `.json`.
//! Writes go to a hidden temp file first, fsync, then rename over the
//! final path, so a crash can never leave a half-written collection
//! visible. Stale temp files from an interrupted write are removed the
//! next time the directory is opened.
//!
//! Reads never fail: a missing, unreadable, or malformed file yields an
//! empty collection and a log line. The cache layer treats whatever this
//! module returns as the collection's current disk state.

use folio_core::{Collection, FolioError, FolioResult};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix shared by all in-flight temp files.
const TEMP_SUFFIX: &str = ".json.tmp";

/// Reads and writes collection blobs.
///
/// The store drives all disk traffic through this trait: reads when a
/// collection misses the cache, writes when the flush sweep persists a
/// dirty collection. Implementations must be callable from multiple
/// threads; the store guarantees it never issues two concurrent reads for
/// the same collection id.
pub trait CollectionIo: Send + Sync {
    /// Load a collection's disk state.
    ///
    /// Missing, unreadable, and malformed files all yield an empty
    /// collection; faults are logged, never surfaced.
    fn read(&self, collection_id: &str) -> Collection;

    /// Persist a collection's serialized form.
    fn write(&self, collection_id: &str, payload: &[u8]) -> io::Result<()>;
}

/// Production [`CollectionIo`]: one JSON file per collection under a
/// single data directory.
#[derive(Debug)]
pub struct CollectionFiles {
    data_dir: PathBuf,
}

impl CollectionFiles {
    /// Open (and if needed create) the data directory.
    ///
    /// Removes temp files left behind by an interrupted write.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::NotADirectory`] when the path exists but is
    /// not a directory, or an I/O error from directory creation/cleanup.
    pub fn open(data_dir: impl Into<PathBuf>) -> FolioResult<Self> {
        let data_dir = data_dir.into();
        if data_dir.exists() && !data_dir.is_dir() {
            return Err(FolioError::NotADirectory(data_dir));
        }
        std::fs::create_dir_all(&data_dir)?;

        let files = CollectionFiles { data_dir };
        let removed = files.cleanup_temp_files()?;
        if removed > 0 {
            warn!(
                target: "folio::io",
                count = removed,
                dir = %files.data_dir.display(),
                "removed stale temp files from an interrupted write"
            );
        }
        Ok(files)
    }

    /// The directory holding collection files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Final path for a collection's data file.
    ///
    /// The collection id is percent-encoded so any id is a valid file name.
    pub fn file_path(&self, collection_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", urlencoding::encode(collection_id)))
    }

    fn temp_path(&self, collection_id: &str) -> PathBuf {
        self.data_dir.join(format!(
            ".{}{}",
            urlencoding::encode(collection_id),
            TEMP_SUFFIX
        ))
    }

    /// Remove leftover temp files. Returns how many were deleted.
    pub fn cleanup_temp_files(&self) -> io::Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
                std::fs::remove_file(entry.path())?;
                count += 1;
            }
        }
        Ok(count)
    }
}

impl CollectionIo for CollectionFiles {
    fn read(&self, collection_id: &str) -> Collection {
        let path = self.file_path(collection_id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(
                    target: "folio::io",
                    collection = collection_id,
                    "no data file yet, starting empty"
                );
                return Collection::new();
            }
            Err(e) => {
                warn!(
                    target: "folio::io",
                    collection = collection_id,
                    error = %e,
                    "failed to read data file, treating as empty"
                );
                return Collection::new();
            }
        };

        match serde_json::from_slice::<Collection>(&bytes) {
            Ok(collection) => collection,
            Err(e) => {
                warn!(
                    target: "folio::io",
                    collection = collection_id,
                    error = %e,
                    "malformed data file, treating as empty"
                );
                Collection::new()
            }
        }
    }

    fn write(&self, collection_id: &str, payload: &[u8]) -> io::Result<()> {
        let final_path = self.file_path(collection_id);
        let temp_path = self.temp_path(collection_id);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(payload)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&temp_path, &final_path)?;

        let dir = File::open(&self.data_dir)?;
        dir.sync_all()?;

        debug!(
            target: "folio::io",
            collection = collection_id,
            bytes = payload.len(),
            "wrote data file"
        );
        Ok(())
    }
}
