//! Gallery Thumbs - Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache operations
pub type GalleryResult<T> = Result<T, GalleryError>;

/// Cache pipeline error types
#[derive(Error, Debug)]
pub enum GalleryError {
    // ═══════════════════════════════════════════════════════════════
    // GENERATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Thumbnail generation failed for {path}: {reason}")]
    Generation { path: PathBuf, reason: String },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image processing error: {0}")]
    Image(String),

    // ═══════════════════════════════════════════════════════════════
    // FILESYSTEM ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path {path} is not inside scan root {root}")]
    OutsideScanRoot { path: PathBuf, root: PathBuf },

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════
    // MANIFEST ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Manifest corrupted: {0}")]
    ManifestCorrupted(String),

    #[error("Could not write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ═══════════════════════════════════════════════════════════════
    // RUNTIME ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    ThreadPool(String),
}

impl GalleryError {
    /// Shorthand for a generation failure on `path`
    pub fn generation(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        GalleryError::Generation {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this error is confined to a single file.
    ///
    /// Such errors are logged and the file is left out of the manifest;
    /// they never abort a scan.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            GalleryError::Generation { .. }
                | GalleryError::UnsupportedFormat(_)
                | GalleryError::Image(_)
                | GalleryError::CreateDir { .. }
                | GalleryError::OutsideScanRoot { .. }
                | GalleryError::Io(_)
        )
    }

    /// Check if this error means the manifest could not be persisted
    pub fn is_manifest_fatal(&self) -> bool {
        matches!(
            self,
            GalleryError::ManifestWrite { .. } | GalleryError::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(e: serde_json::Error) -> Self {
        GalleryError::Serialization(e.to_string())
    }
}

impl From<image::ImageError> for GalleryError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Unsupported(u) => GalleryError::UnsupportedFormat(u.to_string()),
            other => GalleryError::Image(other.to_string()),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for GalleryError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        GalleryError::ThreadPool(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let err = GalleryError::generation("/tmp/a.png", "corrupt");
        assert!(err.is_per_file());
        assert!(!err.is_manifest_fatal());

        let err = GalleryError::ManifestWrite {
            path: PathBuf::from("/tmp/image_links.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_per_file());
        assert!(err.is_manifest_fatal());
    }

    #[test]
    fn test_unsupported_image_error_maps_to_unsupported_format() {
        let err: GalleryError = image::ImageError::Unsupported(
            image::error::UnsupportedError::from_format_and_kind(
                image::error::ImageFormatHint::Unknown,
                image::error::UnsupportedErrorKind::Format(image::error::ImageFormatHint::Unknown),
            ),
        )
        .into();
        assert!(matches!(err, GalleryError::UnsupportedFormat(_)));
    }
}
