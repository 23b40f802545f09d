//! Gallery Thumbs - Copy Selected
//!
//! Exports a selection of manifest records into a user-chosen folder.

use std::path::{Path, PathBuf};

use crate::error::{GalleryError, GalleryResult};
use crate::manifest::ImageRecord;

/// Which file of a record gets copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopySource {
    /// The full-size original
    #[default]
    Original,
    /// The cached thumbnail
    Thumbnail,
}

/// Outcome of a copy run
#[derive(Debug, Default)]
pub struct CopyReport {
    /// Files written into the output folder
    pub copied: Vec<PathBuf>,
    /// Records that could not be copied, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl CopyReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Copy the selected records into `output_folder`.
///
/// Each file is named after the original's basename, even when the thumbnail
/// is copied; an existing file with that name is overwritten. Individual
/// failures are collected, only failing to create `output_folder` aborts.
pub fn copy_selected(
    records: &[ImageRecord],
    output_folder: &Path,
    source: CopySource,
) -> GalleryResult<CopyReport> {
    std::fs::create_dir_all(output_folder).map_err(|e| GalleryError::CreateDir {
        path: output_folder.to_path_buf(),
        source: e,
    })?;

    let mut report = CopyReport::default();

    for record in records {
        let from = match source {
            CopySource::Original => &record.original,
            CopySource::Thumbnail => &record.resized,
        };

        let Some(name) = record.original.file_name() else {
            report
                .failures
                .push((record.original.clone(), "original has no file name".into()));
            continue;
        };
        let to = output_folder.join(name);

        match std::fs::copy(from, &to) {
            Ok(_) => {
                log::debug!("Copied {} to {}", from.display(), to.display());
                report.copied.push(to);
            }
            Err(e) => {
                log::warn!("Could not copy {}: {}", from.display(), e);
                report.failures.push((from.clone(), e.to_string()));
            }
        }
    }

    log::info!(
        "Copied {} of {} selected images to {}",
        report.copied.len(),
        records.len(),
        output_folder.display()
    );

    Ok(report)
}
