//! Gallery Thumbs - CLI
//!
//! Command-line interface for building and using thumbnail caches.

use std::path::{Path, PathBuf};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use gallery_thumbs::paths::{absolutize, default_cache_base};
use gallery_thumbs::{copy_selected, CacheBuilder, CacheConfig, CopySource, Manifest, ScanRoot};

#[derive(Parser)]
#[command(name = "gallery-thumbs")]
#[command(author = "Karen Tonoyan")]
#[command(version = gallery_thumbs::VERSION)]
#[command(about = "Gallery Thumbs - incremental thumbnail cache for image folders")]
struct Cli {
    /// Cache base directory (default: ./cache)
    #[arg(short, long)]
    cache_base: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the thumbnail cache of a folder
    Build {
        /// Original image folder
        folder: PathBuf,

        /// Worker pool size
        #[arg(short, long)]
        workers: Option<usize>,

        /// Thumbnail bounding box side in pixels
        #[arg(short, long)]
        size: Option<u32>,
    },

    /// List the cached images of a folder
    List {
        /// Original image folder
        folder: PathBuf,
    },

    /// Copy cached images of a folder into another folder
    Copy {
        /// Original image folder
        folder: PathBuf,

        /// Destination folder
        output: PathBuf,

        /// Copy thumbnails instead of originals
        #[arg(short, long)]
        thumbnails: bool,

        /// Only copy these originals (default: all)
        #[arg(long, num_args = 1..)]
        only: Vec<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CacheConfig::default(),
    };

    let cache_base = match cli.cache_base {
        Some(base) => base,
        None => default_cache_base()?,
    };

    match cli.command {
        Commands::Build { folder, workers, size } => {
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(size) = size {
                config.max_dimension = size;
            }

            let root = scan_root(&folder, &cache_base)?;
            println!("🖼️  Building thumbnail cache for {}", root.original.display());

            let builder = CacheBuilder::new(config)?;
            let report = builder
                .run(&root)
                .context("the thumbnail cache could not be saved")?;

            println!("✅ Manifest saved at: {}", report.manifest_path.display());
            println!("   Images found:   {}", report.discovered);
            println!("   Generated:      {}", report.generated);
            println!("   Reused:         {}", report.reused);
            println!("   Failed:         {}", report.failed);
            println!("   Pruned records: {}", report.pruned);
            println!("   Took:           {:.2?}", report.elapsed);
        }

        Commands::List { folder } => {
            let root = scan_root(&folder, &cache_base)?;
            let manifest = Manifest::load(&root.cache, &config.manifest_file_name)?;

            if manifest.is_empty() {
                println!("📭 No cached images for {}", root.original.display());
            } else {
                println!("📷 Cached images ({}):", manifest.len());
                println!("{:-<60}", "");
                for record in manifest.records() {
                    println!("{}  ->  {}", record.original.display(), record.resized.display());
                }
            }
        }

        Commands::Copy { folder, output, thumbnails, only } => {
            let root = scan_root(&folder, &cache_base)?;
            let manifest = Manifest::load(&root.cache, &config.manifest_file_name)?;

            let selected: Vec<_> = if only.is_empty() {
                manifest.records().to_vec()
            } else {
                let mut selected = Vec::with_capacity(only.len());
                for path in &only {
                    let path = absolutize(path)?;
                    match manifest.get(&path) {
                        Some(record) => selected.push(record.clone()),
                        None => bail!("{} is not in the cache manifest", path.display()),
                    }
                }
                selected
            };

            let source = if thumbnails {
                CopySource::Thumbnail
            } else {
                CopySource::Original
            };

            let report = copy_selected(&selected, &output, source)?;
            println!("📤 Copied {} images to {}", report.copied.len(), output.display());
            for (path, reason) in &report.failures {
                println!("   ⚠️ {}: {}", path.display(), reason);
            }
        }
    }

    Ok(())
}

/// Scan root for `folder` under the cache base, with an absolute original path
fn scan_root(folder: &Path, cache_base: &Path) -> anyhow::Result<ScanRoot> {
    let folder = absolutize(folder)
        .with_context(|| format!("resolving {}", folder.display()))?;
    Ok(ScanRoot::derive(&folder, cache_base)?)
}
