//! Gallery Thumbs - Cache Path Resolver
//!
//! Maps originals to their mirrored location under the cache folder.

use std::path::{Path, PathBuf};

use crate::error::{GalleryError, GalleryResult};

/// Directory under the cache base that holds every scan root's thumbnails
pub const RESIZED_DIR: &str = "resized";

/// An original folder paired with the cache folder that mirrors it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    /// Folder being scanned
    pub original: PathBuf,
    /// Folder receiving the thumbnails and the manifest
    pub cache: PathBuf,
}

impl ScanRoot {
    /// Pair an original folder with an explicit cache folder
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(original: P, cache: Q) -> Self {
        Self {
            original: original.as_ref().to_path_buf(),
            cache: cache.as_ref().to_path_buf(),
        }
    }

    /// Derive the cache folder as `<cache_base>/resized/<basename(original)>`
    pub fn derive<P: AsRef<Path>, Q: AsRef<Path>>(original: P, cache_base: Q) -> GalleryResult<Self> {
        let original = original.as_ref();
        let name = original
            .file_name()
            .ok_or_else(|| GalleryError::NotADirectory(original.display().to_string()))?;

        Ok(Self {
            original: original.to_path_buf(),
            cache: cache_base.as_ref().join(RESIZED_DIR).join(name),
        })
    }

    /// Resolve a file under this root to its cache location
    pub fn resolve(&self, source: &Path) -> GalleryResult<PathBuf> {
        resolve(source, &self.original, &self.cache)
    }
}

/// Default cache base: `<cwd>/cache`
pub fn default_cache_base() -> GalleryResult<PathBuf> {
    Ok(std::env::current_dir()?.join("cache"))
}

/// Compute where the thumbnail of `source` lives.
///
/// The path of `source` relative to `scan_root` is joined onto `cache_root`,
/// keeping subdirectories, file name and extension. No I/O.
pub fn resolve(source: &Path, scan_root: &Path, cache_root: &Path) -> GalleryResult<PathBuf> {
    let relative = source
        .strip_prefix(scan_root)
        .map_err(|_| GalleryError::OutsideScanRoot {
            path: source.to_path_buf(),
            root: scan_root.to_path_buf(),
        })?;

    if relative.as_os_str().is_empty() {
        return Err(GalleryError::OutsideScanRoot {
            path: source.to_path_buf(),
            root: scan_root.to_path_buf(),
        });
    }

    Ok(cache_root.join(relative))
}

/// Make `path` absolute against the current directory without touching the filesystem
pub fn absolutize(path: &Path) -> GalleryResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_preserves_structure() {
        let dest = resolve(
            Path::new("/photos/2023/summer/beach.JPG"),
            Path::new("/photos"),
            Path::new("/cache/resized/photos"),
        )
        .unwrap();
        assert_eq!(dest, PathBuf::from("/cache/resized/photos/2023/summer/beach.JPG"));
    }

    #[test]
    fn test_resolve_top_level_file() {
        let dest = resolve(Path::new("/photos/a.png"), Path::new("/photos"), Path::new("/c")).unwrap();
        assert_eq!(dest, PathBuf::from("/c/a.png"));
        assert_eq!(dest.parent(), Some(Path::new("/c")));
    }

    #[test]
    fn test_resolve_outside_root() {
        let err = resolve(Path::new("/elsewhere/a.png"), Path::new("/photos"), Path::new("/c")).unwrap_err();
        assert!(matches!(err, GalleryError::OutsideScanRoot { .. }));

        let err = resolve(Path::new("/photos"), Path::new("/photos"), Path::new("/c")).unwrap_err();
        assert!(matches!(err, GalleryError::OutsideScanRoot { .. }));
    }

    #[test]
    fn test_derive_scan_root() {
        let root = ScanRoot::derive("/home/me/Pictures", "/work/cache").unwrap();
        assert_eq!(root.original, PathBuf::from("/home/me/Pictures"));
        assert_eq!(root.cache, PathBuf::from("/work/cache/resized/Pictures"));
        assert_eq!(
            root.resolve(Path::new("/home/me/Pictures/x/y.gif")).unwrap(),
            PathBuf::from("/work/cache/resized/Pictures/x/y.gif")
        );
    }

    #[test]
    fn test_derive_rejects_root_path() {
        assert!(ScanRoot::derive("/", "/cache").is_err());
    }
}
