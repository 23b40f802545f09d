//! # Gallery Thumbs
//!
//! Thumbnail cache pipeline for an image-folder gallery.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      CACHE BUILDER                       │
//! │   walk tree ─► classify ─► resolve path ─► worker pool   │
//! │                                               │          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────┴───────┐  │
//! │  │  CLASSIFIER │  │  RESOLVER   │  │ THUMBNAIL ENGINE │  │
//! │  │  extension  │  │  mirror dir │  │ static + GIF     │  │
//! │  └─────────────┘  └─────────────┘  └──────────┬───────┘  │
//! │                                               │          │
//! │  ┌─────────────────────┐          ┌───────────┴───────┐  │
//! │  │  MANIFEST (JSON)    │◄─ merge ─│  SCRATCH SPACE    │  │
//! │  │  image_links.json   │          │  temp copies      │  │
//! │  └─────────────────────┘          └───────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - An existing cache entry is never regenerated
//! - One failed image never aborts a scan
//! - The manifest is written once, after every worker has finished
//! - Temporary copies never outlive a generation call

pub mod builder;
pub mod classify;
pub mod config;
pub mod copy;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod scratch;
pub mod thumbs;

pub use builder::{build_cache, BuildReport, CacheBuilder, FileOutcome};
pub use classify::is_image;
pub use config::CacheConfig;
pub use copy::{copy_selected, CopyReport, CopySource};
pub use error::{GalleryError, GalleryResult};
pub use manifest::{ImageRecord, Manifest, MANIFEST_FILE_NAME};
pub use paths::{resolve, ScanRoot};
pub use thumbs::ThumbnailEngine;

/// Gallery Thumbs version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
