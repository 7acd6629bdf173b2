//! QR code rendering.

use crate::error::SuiteError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

/// Minimum edge of the rendered code in pixels.
pub const QR_MIN_SIZE: u32 = 200;

/// A rendered QR code.
#[derive(Debug, Clone)]
pub struct QrOutput {
    pub png: Vec<u8>,
    /// `data:image/png;base64,...`, ready for an `<img src>`.
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

/// Encode `text` at error-correction level H, black on white, at least
/// 200×200 pixels.
pub fn generate_qr(text: &str) -> Result<QrOutput, SuiteError> {
    if text.is_empty() {
        return Err(SuiteError::EmptyInput { what: "QR text" });
    }
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H).map_err(|e| {
        SuiteError::QrFailed {
            detail: e.to_string(),
        }
    })?;

    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .dark_color(Luma([0]))
        .light_color(Luma([255]))
        .build();
    let (width, height) = img.dimensions();

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| SuiteError::ImageEncode {
            detail: e.to_string(),
        })?;
    let png = buf.into_inner();
    let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(&png));

    Ok(QrOutput {
        png,
        data_uri,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_at_least_min_size() {
        let qr = generate_qr("https://example.com").unwrap();
        assert!(qr.width >= QR_MIN_SIZE && qr.height >= QR_MIN_SIZE);
        assert!(qr.data_uri.starts_with("data:image/png;base64,"));
        let decoded = image::load_from_memory(&qr.png).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255]);
        assert!(decoded.pixels().any(|p| p.0 == [0]));
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(generate_qr(""), Err(SuiteError::EmptyInput { .. })));
    }

    #[test]
    fn oversized_payload_fails() {
        let long = "x".repeat(5000);
        assert!(matches!(generate_qr(&long), Err(SuiteError::QrFailed { .. })));
    }
}
