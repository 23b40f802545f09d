//! Gallery Thumbs - Scratch Space
//!
//! Owned working directory for temporary copies of originals, and
//! atomic writes for cache entries.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{GalleryError, GalleryResult};

/// Scratch directory owned by one builder; removed with everything in it on drop
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh uniquely named scratch directory under `parent`
    pub fn create(parent: &Path) -> GalleryResult<Self> {
        let path = parent.join(format!("gallery_thumbs_{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&path).map_err(|source| GalleryError::CreateDir {
            path: path.clone(),
            source,
        })?;
        log::debug!("Scratch directory created at {}", path.display());
        Ok(Self { path })
    }

    /// Scratch directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy `source` into the scratch directory under a random name.
    ///
    /// The extension is kept so decoders that look at it still work.
    pub fn copy_in(&self, source: &Path) -> GalleryResult<TempCopy> {
        let mut name = format!("working_temp_{}", Uuid::new_v4());
        if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(ext);
        }

        let path = self.path.join(name);
        let guard = TempCopy { path };
        fs::copy(source, &guard.path)?;
        Ok(guard)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            log::warn!("Could not remove scratch directory {}: {}", self.path.display(), e);
        }
    }
}

/// Temporary copy of an original; the file is deleted when the guard drops
#[derive(Debug)]
pub struct TempCopy {
    path: PathBuf,
}

impl TempCopy {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempCopy {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove temp file {}: {}", self.path.display(), e),
        }
    }
}

/// Write `data` to `path` atomically.
///
/// Bytes go to a uniquely named sibling file which is then renamed over
/// `path`, so readers never observe a truncated file.
pub fn write_atomic(path: &Path, data: &[u8]) -> GalleryResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| GalleryError::NotADirectory(path.display().to_string()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let part = parent.join(format!(".{}.{}.part", file_name, Uuid::new_v4().simple()));

    let result = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&part, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result?;
    Ok(())
}
