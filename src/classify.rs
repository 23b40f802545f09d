//! Gallery Thumbs - Image Classifier
//!
//! Decides by extension alone whether a file belongs in the gallery.

use std::path::Path;

/// Extensions accepted as gallery images (lowercase, no dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Check whether `file_name` has a supported image extension.
///
/// Case-insensitive. Files without an extension are never images.
pub fn is_image<P: AsRef<Path>>(file_name: P) -> bool {
    file_name
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}
