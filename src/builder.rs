//! Gallery Thumbs - Cache Builder
//!
//! Walks a scan root, generates missing thumbnails on a bounded worker pool
//! and writes the manifest once every task has finished.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::classify::is_image;
use crate::config::CacheConfig;
use crate::error::{GalleryError, GalleryResult};
use crate::manifest::{ImageRecord, Manifest};
use crate::paths::{absolutize, ScanRoot};
use crate::scratch::ScratchDir;
use crate::thumbs::ThumbnailEngine;

/// Result of processing one original
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Thumbnail written this run
    Generated(ImageRecord),
    /// Thumbnail already on disk; carries a record when the manifest lacked one
    Reused(Option<ImageRecord>),
    /// Another task is generating the same destination
    InFlight,
    /// Generation failed; the original stays out of the manifest
    Failed,
}

/// Summary of one `run`
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Manifest written at the end of the run
    pub manifest_path: PathBuf,
    /// Records in the saved manifest
    pub records: usize,
    /// Images discovered under the scan root
    pub discovered: usize,
    /// Thumbnails generated
    pub generated: usize,
    /// Existing thumbnails reused
    pub reused: usize,
    /// Existing thumbnails whose record was missing and got re-added
    pub adopted: usize,
    /// Originals that failed
    pub failed: usize,
    /// Stale records dropped
    pub pruned: usize,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration
    pub elapsed: Duration,
}

/// Scan & dispatch engine
pub struct CacheBuilder {
    /// Configuration
    config: CacheConfig,
    /// Thumbnail engine shared by all workers
    engine: ThumbnailEngine,
    /// Bounded worker pool
    pool: rayon::ThreadPool,
    /// Destinations currently being generated
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl CacheBuilder {
    /// Create a builder with its own scratch directory and worker pool
    pub fn new(config: CacheConfig) -> GalleryResult<Self> {
        config.validate()?;

        let scratch = ScratchDir::create(&config.scratch_parent())?;
        let engine = ThumbnailEngine::new(scratch, config.max_dimension);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("thumb-{}", i))
            .build()?;

        Ok(Self {
            config,
            engine,
            pool,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Build the cache for `original_folder` into `cache_folder` and return the manifest path
    pub fn build_cache<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        original_folder: P,
        cache_folder: Q,
    ) -> GalleryResult<PathBuf> {
        let root = ScanRoot::new(original_folder, cache_folder);
        Ok(self.run(&root)?.manifest_path)
    }

    /// Bring the cache of `root` up to date.
    ///
    /// Per-file failures are logged and counted; only manifest I/O and an
    /// invalid scan root make this return an error.
    pub fn run(&self, root: &ScanRoot) -> GalleryResult<BuildReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        if !root.original.is_dir() {
            return Err(GalleryError::NotADirectory(root.original.display().to_string()));
        }
        let root = ScanRoot::new(absolutize(&root.original)?, absolutize(&root.cache)?);

        // Load existing manifest
        let mut manifest = Manifest::load(&root.cache, &self.config.manifest_file_name)?;
        let pruned = if self.config.prune_stale {
            manifest.prune_missing()
        } else {
            0
        };

        // Discover originals
        let candidates = discover_images(&root);
        log::info!(
            "Scanning {}: {} images, {} already in manifest",
            root.original.display(),
            candidates.len(),
            manifest.len()
        );

        // Dispatch to worker pool
        let outcomes: Vec<FileOutcome> = {
            let manifest = &manifest;
            let root = &root;
            self.pool.install(|| {
                candidates
                    .par_iter()
                    .map(|source| self.process(root, source, manifest))
                    .collect()
            })
        };

        let mut report = BuildReport {
            manifest_path: manifest.path().to_path_buf(),
            records: 0,
            discovered: candidates.len(),
            generated: 0,
            reused: 0,
            adopted: 0,
            failed: 0,
            pruned,
            started_at,
            elapsed: Duration::ZERO,
        };

        // Merge results
        for outcome in outcomes {
            match outcome {
                FileOutcome::Generated(record) => {
                    manifest.push(record);
                    report.generated += 1;
                }
                FileOutcome::Reused(record) => {
                    report.reused += 1;
                    if let Some(record) = record {
                        if manifest.push(record) {
                            report.adopted += 1;
                        }
                    }
                }
                FileOutcome::InFlight => {}
                FileOutcome::Failed => report.failed += 1,
            }
        }

        // Persist manifest
        manifest.save()?;

        report.records = manifest.len();
        report.elapsed = clock.elapsed();
        log::info!(
            "Cache for {} ready: {} generated, {} reused, {} failed, {} pruned in {:.2?}",
            root.original.display(),
            report.generated,
            report.reused,
            report.failed,
            report.pruned,
            report.elapsed
        );

        Ok(report)
    }

    /// Handle one original. Never panics or returns an error: failures become `Failed`.
    fn process(&self, root: &ScanRoot, source: &Path, manifest: &Manifest) -> FileOutcome {
        let dest = match root.resolve(source) {
            Ok(dest) => dest,
            Err(e) => {
                log::warn!("Skipping {}: {}", source.display(), e);
                return FileOutcome::Failed;
            }
        };

        // manifest paths are JSON strings
        if source.to_str().is_none() || dest.to_str().is_none() {
            log::warn!("Skipping {}: path is not valid UTF-8", source.display());
            return FileOutcome::Failed;
        }

        if dest.exists() {
            log::debug!("Thumbnail already exists for {}, skipping", source.display());
            return FileOutcome::Reused(
                (!manifest.contains_original(source)).then(|| ImageRecord::new(source, &dest)),
            );
        }

        let Some(_claim) = Claim::acquire(&self.in_flight, &dest) else {
            log::debug!("{} is already being generated", dest.display());
            return FileOutcome::InFlight;
        };

        // a concurrent run may have finished it between the check and the claim
        if dest.exists() {
            return FileOutcome::Reused(
                (!manifest.contains_original(source)).then(|| ImageRecord::new(source, &dest)),
            );
        }

        if let Some(parent) = dest.parent() {
            if let Err(source_err) = std::fs::create_dir_all(parent) {
                let e = GalleryError::CreateDir {
                    path: parent.to_path_buf(),
                    source: source_err,
                };
                log::warn!("Failed to cache {}: {}", source.display(), e);
                return FileOutcome::Failed;
            }
        }

        match self.engine.generate(source, &dest) {
            Ok(info) => {
                log::info!(
                    "Resized {} to {} ({}x{}, {} frame{})",
                    source.display(),
                    dest.display(),
                    info.width,
                    info.height,
                    info.frames,
                    if info.frames == 1 { "" } else { "s" }
                );
                FileOutcome::Generated(ImageRecord::new(source, dest))
            }
            Err(e) => {
                log::warn!("Failed to cache {}: {}", source.display(), e);
                FileOutcome::Failed
            }
        }
    }
}

/// Every supported image under the scan root, in sorted walk order.
///
/// The cache folder itself is skipped when it lives inside the original tree.
pub fn discover_images(root: &ScanRoot) -> Vec<PathBuf> {
    WalkDir::new(&root.original)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() != root.cache)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Cannot read directory entry: {}", e);
                None
            }
        })
        // symlinked images count, dangling links do not
        .filter(|entry| entry.path().is_file() && is_image(entry.file_name()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Exclusive hold on a destination path, released on drop
struct Claim<'a> {
    set: &'a Mutex<HashSet<PathBuf>>,
    path: PathBuf,
}

impl<'a> Claim<'a> {
    fn acquire(set: &'a Mutex<HashSet<PathBuf>>, path: &Path) -> Option<Self> {
        if set.lock().insert(path.to_path_buf()) {
            Some(Self {
                set,
                path: path.to_path_buf(),
            })
        } else {
            None
        }
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.path);
    }
}

/// Build the cache with default settings and return the manifest path
pub fn build_cache<P: AsRef<Path>, Q: AsRef<Path>>(original_folder: P, cache_folder: Q) -> GalleryResult<PathBuf> {
    CacheBuilder::new(CacheConfig::default())?.build_cache(original_folder, cache_folder)
}
