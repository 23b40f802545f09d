//! Gallery Thumbs - Thumbnail Engine
//!
//! Downscales one original into its cache entry. Animated GIFs keep every
//! frame, its delay and the loop count; everything else becomes a static
//! image in the format named by the destination extension.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, Frame, GenericImageView, ImageFormat, ImageReader};

use crate::error::{GalleryError, GalleryResult};
use crate::scratch::{write_atomic, ScratchDir};

/// Default bounding box side in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 256;

/// What a successful generation produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailInfo {
    pub width: u32,
    pub height: u32,
    /// 1 for static output
    pub frames: usize,
}

/// Thumbnail Engine
pub struct ThumbnailEngine {
    /// Bounding box side (square)
    max_dimension: u32,
    /// Resampling filter
    filter: FilterType,
    /// Where originals are copied before decoding
    scratch: ScratchDir,
}

impl ThumbnailEngine {
    /// Create new thumbnail engine working in `scratch`
    pub fn new(scratch: ScratchDir, max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            filter: FilterType::Lanczos3,
            scratch,
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Generate the thumbnail of `source` at `dest`.
    ///
    /// The original is copied into scratch space first and only the copy is
    /// decoded; the copy is gone when this returns, whatever the outcome.
    /// On failure nothing is left at `dest`.
    pub fn generate(&self, source: &Path, dest: &Path) -> GalleryResult<ThumbnailInfo> {
        // Destination format from its extension
        let dest_format = ImageFormat::from_path(dest).map_err(|_| {
            GalleryError::UnsupportedFormat(format!("no encoder for {}", dest.display()))
        })?;

        // Work on a private copy of the original
        let working = self.scratch.copy_in(source)?;

        // Sniff the real content format
        let source_format = ImageReader::open(working.path())?
            .with_guessed_format()?
            .format();

        let (bytes, info) = match (source_format, dest_format) {
            (Some(ImageFormat::Gif), ImageFormat::Gif) => self.render_animated(working.path())?,
            (Some(_), _) => self.render_static(working.path(), dest_format)?,
            (None, _) => {
                return Err(GalleryError::generation(source, "unrecognised image content"));
            }
        };

        // Write the cache entry
        write_atomic(dest, &bytes)?;
        Ok(info)
    }

    /// Downscale a single-frame image and encode it as `format`
    fn render_static(&self, path: &Path, format: ImageFormat) -> GalleryResult<(Vec<u8>, ThumbnailInfo)> {
        // Load image
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;

        // Generate thumbnail
        let thumb = self.resize_to_thumbnail(img);
        let (width, height) = thumb.dimensions();

        // Encode in the destination format
        let thumb = prepare_for_encoder(thumb, format);
        let mut output = Vec::new();
        thumb.write_to(&mut Cursor::new(&mut output), format)?;

        Ok((output, ThumbnailInfo { width, height, frames: 1 }))
    }

    /// Downscale every frame of a GIF, keeping delays and the loop count
    fn render_animated(&self, path: &Path) -> GalleryResult<(Vec<u8>, ThumbnailInfo)> {
        let repeat = read_gif_repeat(path)?;

        // Decode every frame, composited onto the full canvas
        let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
        let frames = decoder.into_frames().collect_frames()?;
        if frames.is_empty() {
            return Err(GalleryError::generation(path, "animation has no frames"));
        }

        let mut size = (0, 0);
        let resized: Vec<Frame> = frames
            .into_iter()
            .map(|frame| {
                let delay = frame.delay();
                let thumb = self.resize_to_thumbnail(DynamicImage::ImageRgba8(frame.into_buffer()));
                size = thumb.dimensions();
                // frames are full-canvas, so the scaled frame starts at the origin
                Frame::from_parts(thumb.to_rgba8(), 0, 0, delay)
            })
            .collect();
        let frame_count = resized.len();

        // Encode as an animated GIF
        let mut output = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut output);
            encoder.set_repeat(repeat)?;
            encoder.encode_frames(resized)?;
        }

        Ok((
            output,
            ThumbnailInfo {
                width: size.0,
                height: size.1,
                frames: frame_count,
            },
        ))
    }

    /// Fit into the bounding box, preserving aspect ratio; never upscales
    fn resize_to_thumbnail(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (new_width, new_height) = fit_within(width, height, self.max_dimension);

        if (new_width, new_height) == (width, height) {
            img
        } else {
            img.resize_exact(new_width, new_height, self.filter)
        }
    }
}

/// Dimensions of a `width`x`height` image shrunk to fit a `max`x`max` box
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let ratio = max as f64 / width.max(height) as f64;
    let scale = |side: u32| ((side as f64 * ratio).round() as u32).clamp(1, max);
    (scale(width), scale(height))
}

/// Convert pixel layouts the target encoder cannot take
fn prepare_for_encoder(img: DynamicImage, format: ImageFormat) -> DynamicImage {
    match format {
        ImageFormat::Jpeg => match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        ImageFormat::Bmp | ImageFormat::Gif => match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        },
        _ => img,
    }
}

/// Application extension identifiers that carry a loop count
const LOOP_EXTENSIONS: [&[u8]; 2] = [b"NETSCAPE2.0", b"ANIMEXTS1.0"];

/// Read the loop count of a GIF; absent means loop forever.
///
/// Only the blocks before the first image descriptor are read.
pub fn read_gif_repeat(path: &Path) -> GalleryResult<Repeat> {
    let reader = BufReader::new(File::open(path)?);
    match parse_gif_repeat(reader) {
        Ok(repeat) => Ok(repeat),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(Repeat::Infinite),
        Err(e) => Err(e.into()),
    }
}

fn parse_gif_repeat<R: Read>(mut reader: R) -> std::io::Result<Repeat> {
    // Header + logical screen descriptor
    let mut head = [0u8; 13];
    reader.read_exact(&mut head)?;
    if &head[..3] != b"GIF" {
        return Ok(Repeat::Infinite);
    }

    // Global color table
    let packed = head[10];
    if packed & 0x80 != 0 {
        let table_len = 3 * (1u64 << ((packed & 0x07) + 1));
        skip_exact(&mut reader, table_len)?;
    }

    loop {
        match read_byte(&mut reader)? {
            // extension introducer
            0x21 => {
                let label = read_byte(&mut reader)?;
                if label == 0xFF {
                    if let Some(repeat) = read_application_extension(&mut reader)? {
                        return Ok(repeat);
                    }
                } else {
                    skip_sub_blocks(&mut reader)?;
                }
            }
            // image descriptor, trailer or garbage: no loop extension before the frames
            _ => return Ok(Repeat::Infinite),
        }
    }
}

/// Parse an application extension after its label; `Some` when it is a loop extension
fn read_application_extension<R: Read>(reader: &mut R) -> std::io::Result<Option<Repeat>> {
    let id_len = read_byte(reader)? as usize;
    let mut id = vec![0u8; id_len];
    reader.read_exact(&mut id)?;

    if !LOOP_EXTENSIONS.iter().any(|ext| *ext == id.as_slice()) {
        skip_sub_blocks(reader)?;
        return Ok(None);
    }

    let mut repeat = None;
    loop {
        let len = read_byte(reader)? as usize;
        if len == 0 {
            break;
        }
        let mut block = vec![0u8; len];
        reader.read_exact(&mut block)?;

        // sub-block id 1: u16 little-endian count
        if repeat.is_none() && len >= 3 && block[0] == 1 {
            repeat = Some(match u16::from_le_bytes([block[1], block[2]]) {
                0 => Repeat::Infinite,
                n => Repeat::Finite(n),
            });
        }
    }

    Ok(repeat)
}

fn read_byte<R: Read>(reader: &mut R) -> std::io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn skip_exact<R: Read>(reader: &mut R, len: u64) -> std::io::Result<()> {
    let skipped = std::io::copy(&mut reader.by_ref().take(len), &mut std::io::sink())?;
    if skipped < len {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

fn skip_sub_blocks<R: Read>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let len = read_byte(reader)?;
        if len == 0 {
            return Ok(());
        }
        skip_exact(reader, len as u64)?;
    }
}
