//! The lossy encoder seam used by the compressor, plus its JPEG implementation.
//!
//! The bisection loop only needs `encode(image, quality) -> bytes`. Keeping
//! that behind [`ImageEncoder`] lets tests script exact byte sizes per
//! quality, and lets callers plug in other codecs without touching the loop.

use crate::error::SuiteError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::sync::Arc;
use tracing::debug;

/// One encoder output: the bytes and the quality that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub quality: f32,
}

impl EncodedImage {
    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// An encoder whose output size is steered by a quality parameter in `[0, 1]`.
///
/// Implementations are expected (not required) to be monotonic: higher
/// quality, larger output. The search stays well-defined either way but may
/// settle on a local optimum for a non-monotonic codec.
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    /// The prepared raster the encoder works from.
    type Image: Send + Sync;

    /// Encode `image` at `quality`. Failures abort the whole compression.
    async fn encode(&self, image: &Self::Image, quality: f32) -> Result<EncodedImage, SuiteError>;
}

/// Baseline JPEG encoder backed by the `image` crate.
///
/// Encoding is CPU-bound, so each probe runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegQualityEncoder;

impl JpegQualityEncoder {
    /// Decode `bytes` and cap the longest edge at `max_dimension`.
    pub fn prepare(
        bytes: &[u8],
        max_dimension: Option<u32>,
    ) -> Result<Arc<DynamicImage>, SuiteError> {
        let img = image::load_from_memory(bytes).map_err(|e| SuiteError::ImageDecode {
            detail: e.to_string(),
        })?;
        Ok(Arc::new(fit_within(img, max_dimension)))
    }
}

#[async_trait]
impl ImageEncoder for JpegQualityEncoder {
    type Image = Arc<DynamicImage>;

    async fn encode(&self, image: &Self::Image, quality: f32) -> Result<EncodedImage, SuiteError> {
        let img = Arc::clone(image);
        tokio::task::spawn_blocking(move || encode_jpeg(&img, quality))
            .await
            .map_err(|e| SuiteError::Internal(format!("Encode task panicked: {}", e)))?
    }
}

/// Encode as JPEG at `quality` (0–1), flattening any alpha onto white.
pub fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<EncodedImage, SuiteError> {
    let q = jpeg_quality(quality);
    let rgb = flatten_on_white(img);

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, q)
        .encode_image(&rgb)
        .map_err(|e| SuiteError::ImageEncode {
            detail: e.to_string(),
        })?;

    debug!("Encoded {}x{} JPEG at q={} → {} bytes", rgb.width(), rgb.height(), q, buf.len());
    Ok(EncodedImage {
        bytes: buf,
        quality,
    })
}

/// Map a `[0, 1]` quality onto libjpeg's `1..=100` scale.
pub(crate) fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Composite the image over an opaque white background.
///
/// JPEG has no alpha channel; dropping alpha without compositing turns
/// transparent regions black.
pub(crate) fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = img.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let p = rgba.get_pixel(x, y).0;
        let a = p[3] as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

/// Downscale so that neither edge exceeds `max_dimension`, keeping aspect.
fn fit_within(img: DynamicImage, max_dimension: Option<u32>) -> DynamicImage {
    match max_dimension {
        Some(max) if img.width().max(img.height()) > max => {
            debug!(
                "Downscaling {}x{} to fit within {} px",
                img.width(),
                img.height(),
                max
            );
            img.resize(max, max, FilterType::Lanczos3)
        }
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        }))
    }

    #[test]
    fn quality_mapping_is_clamped() {
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(0.55), 55);
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(1.7), 100);
    }

    #[test]
    fn encode_produces_jpeg_magic() {
        let out = encode_jpeg(&gradient(32, 32), 0.8).expect("encode should succeed");
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(out.quality, 0.8);
    }

    #[test]
    fn higher_quality_is_larger_for_detailed_image() {
        let img = gradient(128, 128);
        let low = encode_jpeg(&img, 0.1).unwrap();
        let high = encode_jpeg(&img, 0.95).unwrap();
        assert!(high.size() > low.size(), "{} vs {}", high.size(), low.size());
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let flat = flatten_on_white(&img);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn prepare_downscales_long_edge() {
        let mut png = Vec::new();
        gradient(400, 100)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let prepared = JpegQualityEncoder::prepare(&png, Some(200)).unwrap();
        assert_eq!(prepared.width(), 200);
        assert_eq!(prepared.height(), 50);
    }

    #[test]
    fn prepare_rejects_garbage() {
        let err = JpegQualityEncoder::prepare(b"not an image", None).unwrap_err();
        assert!(matches!(err, SuiteError::ImageDecode { .. }));
    }
}
