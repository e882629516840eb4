//! Thumbnail generation using the image crate.
//!
//! Scales the source to fill the requested box (aspect fill, no upscaling) and
//! encodes the result as JPEG in memory.

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use crate::models::ThumbnailSize;

/// JPEG quality for thumbnail encoding (0-100).
const JPEG_QUALITY: u8 = 85;

/// Thumbnail generator that creates resized JPEG bytes.
pub struct ThumbnailGenerator;

/// Encoded thumbnail and its actual pixel dimensions.
#[derive(Debug, Clone)]
pub struct GeneratedThumbnail {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ThumbnailGenerator {
    /// Generate a thumbnail for `src` that fills `target`.
    ///
    /// # Arguments
    /// * `src` - Source image path
    /// * `target` - Box the thumbnail should cover
    pub fn generate_in_memory(src: &Path, target: ThumbnailSize) -> Result<GeneratedThumbnail> {
        let img = Self::load_image(src)?;
        let (src_width, src_height) = img.dimensions();

        let (thumb_width, thumb_height) = Self::calculate_dimensions(src_width, src_height, target);
        debug!(
            ?src,
            src_width, src_height, thumb_width, thumb_height, "Generating thumbnail"
        );

        // CatmullRom provides good quality/speed balance for downscaling
        let thumbnail = img.resize_exact(thumb_width, thumb_height, FilterType::CatmullRom);

        // JPEG has no alpha channel
        let rgb_img = thumbnail.to_rgb8();
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
        rgb_img
            .write_with_encoder(encoder)
            .with_context(|| format!("Failed to encode thumbnail: {:?}", src))?;

        Ok(GeneratedThumbnail {
            bytes,
            width: thumb_width,
            height: thumb_height,
        })
    }

    /// Decode an image, taking the first frame of animated GIFs.
    fn load_image(path: &Path) -> Result<DynamicImage> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
        let format = image::guess_format(&bytes).ok();

        if format == Some(ImageFormat::Gif) {
            let decoder = GifDecoder::new(Cursor::new(bytes))
                .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
            let mut frames = decoder.into_frames();
            if let Some(frame) = frames.next() {
                let frame = frame.context("Failed to decode GIF frame")?;
                return Ok(DynamicImage::ImageRgba8(frame.into_buffer()));
            }
            return Err(anyhow!("GIF has no frames: {:?}", path));
        }

        match format {
            Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)
                .with_context(|| format!("Failed to decode image: {:?}", path)),
            None => image::load_from_memory(&bytes)
                .with_context(|| format!("Failed to decode image: {:?}", path)),
        }
    }

    /// Dimensions that cover `target` while preserving aspect ratio.
    ///
    /// Sources smaller than the target are kept at their own size.
    fn calculate_dimensions(src_width: u32, src_height: u32, target: ThumbnailSize) -> (u32, u32) {
        if src_width == 0 || src_height == 0 {
            return (target.width(), target.height());
        }

        let scale_w = target.width() as f64 / src_width as f64;
        let scale_h = target.height() as f64 / src_height as f64;
        let scale = scale_w.max(scale_h).min(1.0);

        let width = (src_width as f64 * scale).round() as u32;
        let height = (src_height as f64 * scale).round() as u32;
        (width.max(1), height.max(1))
    }
}
