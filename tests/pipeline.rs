use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, DynamicImage, Frame, GenericImageView, Rgba, RgbaImage};
use tempfile::{tempdir, TempDir};

use gallery_thumbs::{CacheBuilder, CacheConfig, Manifest, ScanRoot};

struct Fixture {
    _dir: TempDir,
    original: PathBuf,
    cache: PathBuf,
    scratch: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let original = dir.path().join("Pictures");
        let scratch = dir.path().join("scratch");
        std::fs::create_dir_all(&original).unwrap();
        std::fs::create_dir_all(&scratch).unwrap();
        let cache = ScanRoot::derive(&original, dir.path().join("cache")).unwrap().cache;
        Self { original, cache, scratch, _dir: dir }
    }

    fn root(&self) -> ScanRoot {
        ScanRoot::new(&self.original, &self.cache)
    }

    fn builder(&self, workers: usize) -> CacheBuilder {
        CacheBuilder::new(CacheConfig {
            workers,
            scratch_parent: Some(self.scratch.clone()),
            ..Default::default()
        })
        .unwrap()
    }

    fn png(&self, relative: &str, width: u32, height: u32) -> PathBuf {
        let path = self.original.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        DynamicImage::new_rgb8(width, height).save(&path).unwrap();
        path
    }

    fn gif(&self, relative: &str, frames: usize, side: u32, delay_ms: u32) -> PathBuf {
        let path = self.original.join(relative);
        let mut encoder = GifEncoder::new(File::create(&path).unwrap());
        encoder.set_repeat(Repeat::Infinite).unwrap();
        encoder
            .encode_frames((0..frames).map(|i| {
                let buffer = RgbaImage::from_pixel(side, side, Rgba([(i * 50) as u8, 0, 200, 255]));
                Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1))
            }))
            .unwrap();
        path
    }

    fn manifest(&self) -> Manifest {
        Manifest::load(&self.cache, gallery_thumbs::MANIFEST_FILE_NAME).unwrap()
    }
}

fn gif_frames(path: &Path) -> Vec<Frame> {
    GifDecoder::new(BufReader::new(File::open(path).unwrap()))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap()
}

#[test]
fn example_scenario_png_and_animated_gif() {
    let fx = Fixture::new();
    let a = fx.png("a.png", 100, 400);
    let b = fx.gif("b.gif", 4, 50, 100);

    let report = fx.builder(10).run(&fx.root()).unwrap();
    assert_eq!(report.manifest_path, fx.cache.join("image_links.json"));
    assert_eq!(report.generated, 2);

    let manifest = fx.manifest();
    assert_eq!(manifest.len(), 2);

    let a_thumb = &manifest.get(&a).unwrap().resized;
    assert_eq!(a_thumb, &fx.cache.join("a.png"));
    assert_eq!(image::open(a_thumb).unwrap().dimensions(), (64, 256));

    let b_thumb = &manifest.get(&b).unwrap().resized;
    let frames = gif_frames(b_thumb);
    assert_eq!(frames.len(), 4);
    for frame in &frames {
        assert!(frame.buffer().width() <= 256 && frame.buffer().height() <= 256);
        assert_eq!(Duration::from(frame.delay()), Duration::from_millis(100));
    }
}

#[test]
fn nested_folders_are_mirrored() {
    let fx = Fixture::new();
    let deep = fx.png("2024/trip/day1/photo.png", 1024, 768);

    fx.builder(2).run(&fx.root()).unwrap();

    let record = fx.manifest().get(&deep).cloned().unwrap();
    assert_eq!(record.resized, fx.cache.join("2024/trip/day1/photo.png"));
    assert_eq!(image::open(&record.resized).unwrap().dimensions(), (256, 192));
}

#[test]
fn second_run_is_idempotent() {
    let fx = Fixture::new();
    for i in 0..6 {
        fx.png(&format!("img{}.png", i), 300 + i * 10, 200);
    }
    fx.gif("anim.gif", 3, 40, 50);
    let builder = fx.builder(4);

    let first = builder.run(&fx.root()).unwrap();
    let first_bytes = std::fs::read(&first.manifest_path).unwrap();

    let second = builder.run(&fx.root()).unwrap();
    assert_eq!(second.generated, 0);
    assert_eq!(second.reused, 7);
    assert_eq!(second.failed, 0);
    assert_eq!(std::fs::read(&second.manifest_path).unwrap(), first_bytes);
}

#[test]
fn deleted_thumbnail_is_regenerated_alone() {
    let fx = Fixture::new();
    let originals: Vec<PathBuf> = (0..5).map(|i| fx.png(&format!("p{}.png", i), 500, 500)).collect();
    let builder = fx.builder(3);
    builder.run(&fx.root()).unwrap();

    let before: HashSet<_> = fx.manifest().records().iter().cloned().collect();
    std::fs::remove_file(fx.cache.join("p2.png")).unwrap();

    let report = builder.run(&fx.root()).unwrap();
    assert_eq!(report.generated, 1);
    assert_eq!(report.reused, 4);

    let manifest = fx.manifest();
    assert_eq!(manifest.len(), originals.len());
    let after: HashSet<_> = manifest.records().iter().cloned().collect();
    assert_eq!(after, before);
    assert!(fx.cache.join("p2.png").exists());
}

#[test]
fn hundred_files_on_ten_workers() {
    let fx = Fixture::new();
    for i in 0..100 {
        fx.png(&format!("batch/{:03}.png", i), 20 + (i as u32 % 7), 30);
    }

    let report = fx.builder(10).run(&fx.root()).unwrap();
    assert_eq!(report.discovered, 100);
    assert_eq!(report.generated, 100);
    assert_eq!(report.failed, 0);

    let manifest = fx.manifest();
    assert_eq!(manifest.len(), 100);
    let unique: HashSet<_> = manifest.records().iter().map(|r| r.original.clone()).collect();
    assert_eq!(unique.len(), 100);
    assert!(manifest.records().iter().all(|r| r.resized.exists()));
}

#[test]
fn non_images_never_reach_the_cache() {
    let fx = Fixture::new();
    fx.png("keep.png", 10, 10);
    std::fs::write(fx.original.join("notes.txt"), b"hello").unwrap();
    std::fs::write(fx.original.join("manual.pdf"), b"%PDF-1.4").unwrap();

    fx.builder(2).run(&fx.root()).unwrap();

    assert_eq!(fx.manifest().len(), 1);
    assert!(!fx.cache.join("notes.txt").exists());
    assert!(!fx.cache.join("manual.pdf").exists());
}

#[test]
fn removed_original_is_pruned() {
    let fx = Fixture::new();
    let gone = fx.png("gone.png", 40, 40);
    fx.png("stays.png", 40, 40);
    let builder = fx.builder(2);
    builder.run(&fx.root()).unwrap();

    std::fs::remove_file(&gone).unwrap();
    let report = builder.run(&fx.root()).unwrap();
    assert_eq!(report.pruned, 1);
    assert_eq!(fx.manifest().len(), 1);
    assert!(fx.manifest().get(&gone).is_none());
}

#[test]
fn corrupt_manifest_is_rebuilt() {
    let fx = Fixture::new();
    fx.png("a.png", 10, 10);
    std::fs::create_dir_all(&fx.cache).unwrap();
    std::fs::write(fx.cache.join("image_links.json"), b"not json at all").unwrap();

    let report = fx.builder(1).run(&fx.root()).unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(fx.manifest().len(), 1);
}

#[test]
fn scratch_space_is_left_clean() {
    let fx = Fixture::new();
    fx.png("a.png", 600, 600);
    std::fs::write(fx.original.join("broken.jpg"), b"nope").unwrap();

    {
        let builder = fx.builder(2);
        builder.run(&fx.root()).unwrap();
    }

    assert_eq!(std::fs::read_dir(&fx.scratch).unwrap().count(), 0);
}

#[test]
fn build_cache_returns_manifest_path() {
    let fx = Fixture::new();
    fx.png("x.bmp", 20, 20);

    let path = fx.builder(2).build_cache(&fx.original, &fx.cache).unwrap();
    assert_eq!(path, fx.cache.join("image_links.json"));
    assert!(path.exists());
}
