//! Gallery Thumbs - Configuration

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{GalleryError, GalleryResult};
use crate::manifest::MANIFEST_FILE_NAME;
use crate::thumbs::DEFAULT_MAX_DIMENSION;

/// Default number of simultaneous generation tasks
pub const DEFAULT_WORKERS: usize = 10;

/// Cache builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Thumbnail bounding box side
    pub max_dimension: u32,
    /// Worker pool size
    pub workers: usize,
    /// Manifest file name inside each cache folder
    pub manifest_file_name: String,
    /// Drop manifest records whose files disappeared
    pub prune_stale: bool,
    /// Parent of the scratch directory (system temp dir when unset)
    pub scratch_parent: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            workers: DEFAULT_WORKERS,
            manifest_file_name: MANIFEST_FILE_NAME.into(),
            prune_stale: true,
            scratch_parent: None,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> GalleryResult<Self> {
        let data = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&data)
            .map_err(|e| GalleryError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> GalleryResult<()> {
        if self.max_dimension == 0 {
            return Err(GalleryError::Config("max_dimension must be positive".into()));
        }
        if self.workers == 0 {
            return Err(GalleryError::Config("workers must be at least 1".into()));
        }
        let name = Path::new(&self.manifest_file_name);
        if self.manifest_file_name.is_empty() || name.file_name() != Some(name.as_os_str()) {
            return Err(GalleryError::Config(format!(
                "manifest_file_name must be a plain file name, got {:?}",
                self.manifest_file_name
            )));
        }
        Ok(())
    }

    /// Scratch parent directory in effect
    pub fn scratch_parent(&self) -> PathBuf {
        self.scratch_parent.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_dimension, 256);
        assert_eq!(config.workers, 10);
        assert_eq!(config.manifest_file_name, "image_links.json");
        assert!(config.prune_stale);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, br#"{ "workers": 3, "max_dimension": 128 }"#).unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.max_dimension, 128);
        assert_eq!(config.manifest_file_name, MANIFEST_FILE_NAME);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = CacheConfig { workers: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(GalleryError::Config(_))));

        let config = CacheConfig { max_dimension: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = CacheConfig { manifest_file_name: "../escape.json".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"workers = 3").unwrap();
        assert!(matches!(CacheConfig::load(&path), Err(GalleryError::Config(_))));
    }
}
