use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Write-once store of raw product images, keyed by product id.
///
/// One file per product at `<dir>/<id>.jpg`, whatever the source format;
/// the extension is part of the naming contract with the static-image
/// route, not a promise about the bytes. Acquisition and ingestion both
/// treat an existing file as already satisfied, so re-runs skip work that
/// is already done.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory the cache lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cached image for `id`, whether or not it exists yet.
    pub fn path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.jpg"))
    }

    /// Whether an image for `id` is already cached.
    pub fn has(&self, id: u64) -> bool {
        self.path(id).is_file()
    }

    /// Read the cached bytes for `id`.
    pub fn get(&self, id: u64) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.path(id))?)
    }

    /// Store bytes for `id` unless an image is already present.
    ///
    /// Returns `true` if the bytes were written and `false` if the cache
    /// already had the image. Writes go through a temporary file in the
    /// cache directory and are renamed into place, so readers never see a
    /// half-written file.
    pub fn put(&self, id: u64, bytes: &[u8]) -> Result<bool> {
        if self.has(id) {
            return Ok(false);
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.persist(self.path(id)).map_err(|e| e.error)?;
        Ok(true)
    }
}
