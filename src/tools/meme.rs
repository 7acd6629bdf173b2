//! Meme captions: outlined, upper-cased text at the top and bottom of an
//! image.
//!
//! No font ships with the crate; the caller passes TrueType/OpenType bytes
//! (an Impact-like face gives the classic look).

use crate::error::SuiteError;
use ab_glyph::{FontVec, PxScale};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::io::Cursor;
use tracing::debug;

/// Download name of a generated meme.
pub const MEME_FILE_NAME: &str = "meme-silentsuite.png";

/// Gap between a caption and the image edge, in pixels.
pub const MEME_MARGIN: i32 = 10;

const FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Which edge a caption hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionEdge {
    Top,
    Bottom,
}

/// Text metrics derived from the image width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemeLayout {
    /// One tenth of the image width, floored.
    pub font_size: u32,
    /// One eighth of the font size, floored. Zero disables the outline.
    pub outline_width: u32,
}

impl MemeLayout {
    pub fn for_width(width: u32) -> Self {
        let font_size = width / 10;
        Self {
            font_size,
            outline_width: font_size / 8,
        }
    }

    /// Top-left corner of a `text_w`×`text_h` caption, centred horizontally.
    pub fn origin(
        &self,
        canvas: (u32, u32),
        text: (u32, u32),
        edge: CaptionEdge,
    ) -> (i32, i32) {
        let x = (canvas.0 as i32 - text.0 as i32) / 2;
        let y = match edge {
            CaptionEdge::Top => MEME_MARGIN,
            CaptionEdge::Bottom => canvas.1 as i32 - MEME_MARGIN - text.1 as i32,
        };
        (x, y)
    }
}

/// A rendered meme.
#[derive(Debug, Clone)]
pub struct MemeOutput {
    /// Always [`MEME_FILE_NAME`].
    pub file_name: String,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Caption `image` with `top` and `bottom` (either may be empty) and encode
/// the result as PNG at the source resolution.
pub async fn generate_meme(
    image: Vec<u8>,
    font: Vec<u8>,
    top: &str,
    bottom: &str,
) -> Result<MemeOutput, SuiteError> {
    if image.is_empty() {
        return Err(SuiteError::EmptyInput { what: "image" });
    }
    let top = top.to_uppercase();
    let bottom = bottom.to_uppercase();
    tokio::task::spawn_blocking(move || meme_blocking(&image, font, &top, &bottom))
        .await
        .map_err(|e| SuiteError::Internal(format!("Meme task panicked: {}", e)))?
}

fn meme_blocking(
    image: &[u8],
    font: Vec<u8>,
    top: &str,
    bottom: &str,
) -> Result<MemeOutput, SuiteError> {
    let mut canvas = image::load_from_memory(image)
        .map_err(|e| SuiteError::ImageDecode {
            detail: e.to_string(),
        })?
        .to_rgba8();
    let font = FontVec::try_from_vec(font).map_err(|e| SuiteError::InvalidFont {
        detail: e.to_string(),
    })?;

    let layout = MemeLayout::for_width(canvas.width());
    draw_caption(&mut canvas, &font, &layout, top, CaptionEdge::Top);
    draw_caption(&mut canvas, &font, &layout, bottom, CaptionEdge::Bottom);

    let (width, height) = canvas.dimensions();
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| SuiteError::ImageEncode {
            detail: e.to_string(),
        })?;
    debug!("Meme {}x{} at {}px text", width, height, layout.font_size);

    Ok(MemeOutput {
        file_name: MEME_FILE_NAME.to_string(),
        png: buf.into_inner(),
        width,
        height,
    })
}

/// Stroke then fill, like a canvas `strokeText` + `fillText` pair.
fn draw_caption(
    canvas: &mut RgbaImage,
    font: &FontVec,
    layout: &MemeLayout,
    text: &str,
    edge: CaptionEdge,
) {
    if text.trim().is_empty() || layout.font_size == 0 {
        return;
    }
    let scale = PxScale::from(layout.font_size as f32);
    let size = text_size(scale, font, text);
    let (x, y) = layout.origin(canvas.dimensions(), size, edge);

    // A stroke of width w reaches w/2 past the glyph edge.
    let r = (layout.outline_width as i32 + 1) / 2;
    if layout.outline_width > 0 {
        for dy in -r..=r {
            for dx in -r..=r {
                if (dx, dy) != (0, 0) && dx * dx + dy * dy <= r * r {
                    draw_text_mut(canvas, OUTLINE, x + dx, y + dy, scale, font, text);
                }
            }
        }
    }
    draw_text_mut(canvas, FILL, x, y, scale, font, text);
}
