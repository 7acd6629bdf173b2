//! Image format conversion between JPEG and PNG.

use crate::compress::encode_jpeg;
use crate::error::SuiteError;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

/// Quality used when converting to JPEG.
pub const JPEG_CONVERT_QUALITY: f32 = 0.9;

/// Conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormatTarget {
    Jpeg,
    Png,
}

impl ImageFormatTarget {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormatTarget::Jpeg => "jpg",
            ImageFormatTarget::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormatTarget::Jpeg => "image/jpeg",
            ImageFormatTarget::Png => "image/png",
        }
    }
}

impl FromStr for ImageFormatTarget {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "image/jpeg" => Ok(ImageFormatTarget::Jpeg),
            "png" | "image/png" => Ok(ImageFormatTarget::Png),
            other => Err(SuiteError::InvalidConfig(format!(
                "unsupported output format '{other}' (expected jpeg or png)"
            ))),
        }
    }
}

/// A converted image and its download name.
#[derive(Debug, Clone)]
pub struct ConvertedImage {
    /// `converted.{jpg|png}`
    pub file_name: String,
    pub format: ImageFormatTarget,
    pub bytes: Vec<u8>,
}

/// Decode any supported raster and re-encode it as `format`.
///
/// JPEG output is composited over white at quality 0.9; PNG keeps alpha.
pub async fn convert_image(
    bytes: Vec<u8>,
    format: ImageFormatTarget,
) -> Result<ConvertedImage, SuiteError> {
    if bytes.is_empty() {
        return Err(SuiteError::EmptyInput { what: "image" });
    }
    tokio::task::spawn_blocking(move || convert_blocking(&bytes, format))
        .await
        .map_err(|e| SuiteError::Internal(format!("Convert task panicked: {}", e)))?
}

fn convert_blocking(bytes: &[u8], format: ImageFormatTarget) -> Result<ConvertedImage, SuiteError> {
    let img = image::load_from_memory(bytes).map_err(|e| SuiteError::ImageDecode {
        detail: e.to_string(),
    })?;

    let out = match format {
        ImageFormatTarget::Jpeg => encode_jpeg(&img, JPEG_CONVERT_QUALITY)?.bytes,
        ImageFormatTarget::Png => {
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, ImageFormat::Png)
                .map_err(|e| SuiteError::ImageEncode {
                    detail: e.to_string(),
                })?;
            buf.into_inner()
        }
    };
    debug!(
        "Converted {}x{} image to {} ({} bytes)",
        img.width(),
        img.height(),
        format.extension(),
        out.len()
    );

    Ok(ConvertedImage {
        file_name: format!("converted.{}", format.extension()),
        format,
        bytes: out,
    })
}
