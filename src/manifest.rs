//! Gallery Thumbs - Manifest Store
//!
//! Persists the ordered list of {original -> resized} pairs for one scan root
//! as a JSON array next to the thumbnails.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{GalleryError, GalleryResult};
use crate::scratch::write_atomic;

/// Default manifest file name inside the cache folder
pub const MANIFEST_FILE_NAME: &str = "image_links.json";

/// One cached thumbnail
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Absolute path of the original image
    pub original: PathBuf,
    /// Absolute path of its thumbnail
    pub resized: PathBuf,
}

impl ImageRecord {
    pub fn new(original: impl Into<PathBuf>, resized: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            resized: resized.into(),
        }
    }
}

/// Manifest of one scan root
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Where the manifest is stored
    path: PathBuf,
    /// Records in insertion order
    records: Vec<ImageRecord>,
    /// Originals already present in `records`
    originals: HashSet<PathBuf>,
}

impl Manifest {
    /// Empty manifest that will be saved at `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            originals: HashSet::new(),
        }
    }

    /// Load `<cache_folder>/<file_name>`.
    ///
    /// A missing file gives an empty manifest. So does a malformed one, or a
    /// directory in its place: it is logged and the next save decides. Other
    /// read errors propagate.
    pub fn load(cache_folder: &Path, file_name: &str) -> GalleryResult<Self> {
        Self::load_from(cache_folder.join(file_name))
    }

    /// Load a manifest from an explicit file path, same rules as [`Manifest::load`]
    pub fn load_from(path: impl Into<PathBuf>) -> GalleryResult<Self> {
        let path = path.into();

        if path.is_dir() {
            log::warn!("Manifest path {} is a directory, starting empty", path.display());
            return Ok(Self::empty(path));
        }

        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No manifest at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(e.into()),
        };

        match Self::parse(&data) {
            Ok(records) => {
                let mut manifest = Self::empty(path);
                manifest.extend(records);
                Ok(manifest)
            }
            Err(e) => {
                log::warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
                Ok(Self::empty(path))
            }
        }
    }

    /// Decode manifest JSON
    pub fn parse(data: &[u8]) -> GalleryResult<Vec<ImageRecord>> {
        serde_json::from_slice(data).map_err(|e| GalleryError::ManifestCorrupted(e.to_string()))
    }

    /// Write the full manifest, replacing the previous file atomically
    pub fn save(&self) -> GalleryResult<()> {
        let data = serde_json::to_vec_pretty(&self.records)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| GalleryError::ManifestWrite {
                path: self.path.clone(),
                source,
            })?;
        }

        write_atomic(&self.path, &data).map_err(|e| match e {
            GalleryError::Io(source) => GalleryError::ManifestWrite {
                path: self.path.clone(),
                source,
            },
            other => other,
        })?;

        log::info!("Manifest saved at {} ({} records)", self.path.display(), self.records.len());
        Ok(())
    }

    /// Append a record unless its original is already listed.
    ///
    /// Returns whether the record was added.
    pub fn push(&mut self, record: ImageRecord) -> bool {
        if self.originals.contains(&record.original) {
            return false;
        }
        self.originals.insert(record.original.clone());
        self.records.push(record);
        true
    }

    /// Append several records, skipping duplicate originals; returns how many were added
    pub fn extend<I: IntoIterator<Item = ImageRecord>>(&mut self, records: I) -> usize {
        let mut added = 0;
        for record in records {
            if self.push(record) {
                added += 1;
            }
        }
        added
    }

    /// Drop records for which `keep` is false; returns how many were removed
    pub fn retain<F: FnMut(&ImageRecord) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.records.len();
        self.records.retain(|r| keep(r));
        self.originals = self.records.iter().map(|r| r.original.clone()).collect();
        before - self.records.len()
    }

    /// Drop records whose original or thumbnail no longer exists on disk
    pub fn prune_missing(&mut self) -> usize {
        let removed = self.retain(|r| r.original.exists() && r.resized.exists());
        if removed > 0 {
            log::info!("Pruned {} stale manifest records", removed);
        }
        removed
    }

    pub fn contains_original(&self, original: &Path) -> bool {
        self.originals.contains(original)
    }

    /// Record for `original`, if any
    pub fn get(&self, original: &Path) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.original == original)
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ImageRecord> {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
