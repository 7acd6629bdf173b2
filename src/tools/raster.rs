//! PDF to JPEG: render each page and encode it.
//!
//! Pages are rendered one after another on a single blocking thread; the
//! pdfium document cannot leave that thread, and memory stays bounded to
//! one bitmap at a time plus the encoded outputs.

use crate::compress::encode_jpeg;
use crate::error::SuiteError;
use crate::pdfium::{bind, load_err};
use crate::progress::ProgressCallback;
use crate::tools::pdf::NamedFile;
use pdfium_render::prelude::*;
use std::fmt;
use tracing::{debug, info};

/// Rendering parameters.
#[derive(Clone)]
pub struct RasterOptions {
    /// Multiplier over the page's size in points. Default: 1.5.
    pub scale: f32,
    /// JPEG quality in `(0, 1]`. Default: 0.85.
    pub quality: f32,
    /// Optional per-page progress.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.5,
            quality: 0.85,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RasterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterOptions")
            .field("scale", &self.scale)
            .field("quality", &self.quality)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

/// One rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page_num: usize,
    /// `Page-{n}-{source name}.jpg`
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Output name for page `page_num` of `source`.
pub fn page_file_name(page_num: usize, source: &str) -> String {
    format!("Page-{page_num}-{source}.jpg")
}

/// Render every page of `file` to JPEG.
pub async fn rasterize_pdf(
    file: NamedFile,
    options: &RasterOptions,
) -> Result<Vec<RenderedPage>, SuiteError> {
    if !(options.scale.is_finite() && options.scale > 0.0) {
        return Err(SuiteError::InvalidConfig(format!(
            "render scale must be > 0, got {}",
            options.scale
        )));
    }
    if !(options.quality > 0.0 && options.quality <= 1.0) {
        return Err(SuiteError::InvalidConfig(format!(
            "JPEG quality must be in (0, 1], got {}",
            options.quality
        )));
    }
    let options = options.clone();
    tokio::task::spawn_blocking(move || rasterize_blocking(file, &options))
        .await
        .map_err(|e| SuiteError::Internal(format!("Render task panicked: {}", e)))?
}

fn rasterize_blocking(
    file: NamedFile,
    options: &RasterOptions,
) -> Result<Vec<RenderedPage>, SuiteError> {
    let pdfium = bind()?;
    let NamedFile { name, bytes } = file;
    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(load_err(&name))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("Rasterising {} ({} pages)", name, total);

    let cb = options.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_task_start("pdf2img", total);
    }

    let render_config = PdfRenderConfig::new().scale_page_by_factor(options.scale);
    let mut out = Vec::with_capacity(total);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        if let Some(cb) = cb {
            cb.on_step_start(page_num, total);
        }

        let image = page
            .render_with_config(&render_config)
            .map_err(|e| SuiteError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?
            .as_image();

        let encoded = encode_jpeg(&image, options.quality)?;
        debug!(
            "Page {} → {}x{} px, {} bytes",
            page_num,
            image.width(),
            image.height(),
            encoded.size()
        );
        if let Some(cb) = cb {
            cb.on_step_complete(page_num, total, encoded.size());
        }

        out.push(RenderedPage {
            page_num,
            file_name: page_file_name(page_num, &name),
            width: image.width(),
            height: image.height(),
            bytes: encoded.bytes,
        });
    }

    if let Some(cb) = cb {
        cb.on_task_complete("pdf2img", out.len());
    }
    Ok(out)
}
