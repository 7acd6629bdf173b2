//! PDF assembly: merge, split and image-to-PDF.
//!
//! Every function binds pdfium inside `spawn_blocking`; the pdfium handle and
//! all documents live and die on that blocking thread.

use crate::error::SuiteError;
use crate::pdfium::{bind, load_err, op_err};
use crate::tools::pages::parse_page_range;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Output name of a merge.
pub const MERGED_FILE_NAME: &str = "SilentSuite-Merged.pdf";
/// Output name of an image-to-PDF conversion.
pub const IMAGES_PDF_FILE_NAME: &str = "Images-to-PDF.pdf";

/// A file's display name and contents.
#[derive(Clone, PartialEq, Eq)]
pub struct NamedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for NamedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedFile")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl NamedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file, naming it by its final path component.
    pub async fn read(path: &std::path::Path) -> Result<Self, SuiteError> {
        let bytes = tokio::fs::read(path).await.map_err(|_| SuiteError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    /// Write the contents to `path`, creating parent directories.
    pub async fn write_to(&self, path: &std::path::Path) -> Result<(), SuiteError> {
        let wrap = |source| SuiteError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
        }
        tokio::fs::write(path, &self.bytes).await.map_err(wrap)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The pages a split kept, alongside the new document.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub file: NamedFile,
    /// 0-based indices copied from the source, ascending.
    pub pages: Vec<usize>,
    pub source_pages: usize,
}

async fn run_blocking<T, F>(what: &'static str, f: F) -> Result<T, SuiteError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SuiteError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SuiteError::Internal(format!("{what} task panicked: {e}")))?
}

// ── Merge ────────────────────────────────────────────────────────────────

/// Concatenate every page of `files`, in order, into one document.
///
/// Fails with [`SuiteError::NotEnoughFiles`] for fewer than two inputs.
pub async fn merge_pdfs(files: Vec<NamedFile>) -> Result<NamedFile, SuiteError> {
    if files.len() < 2 {
        return Err(SuiteError::NotEnoughFiles { count: files.len() });
    }
    run_blocking("Merge", move || merge_blocking(files)).await
}

fn merge_blocking(files: Vec<NamedFile>) -> Result<NamedFile, SuiteError> {
    let pdfium = bind()?;
    let mut merged = pdfium.create_new_pdf().map_err(op_err("create"))?;

    for file in files {
        let NamedFile { name, bytes } = file;
        let source = pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(load_err(&name))?;
        debug!("Appending {} ({} pages)", name, source.pages().len());
        merged.pages_mut().append(&source).map_err(op_err("append"))?;
    }

    let total = merged.pages().len();
    let bytes = merged.save_to_bytes().map_err(op_err("save"))?;
    info!("Merged into {} pages ({} bytes)", total, bytes.len());
    Ok(NamedFile::new(MERGED_FILE_NAME, bytes))
}

// ── Split ────────────────────────────────────────────────────────────────

/// Copy the pages selected by `range` (e.g. `"1-3, 5"`) into a new document
/// named `Split-{name}`.
pub async fn split_pdf(file: NamedFile, range: &str) -> Result<SplitOutput, SuiteError> {
    if range.trim().is_empty() {
        return Err(SuiteError::EmptyInput { what: "page range" });
    }
    let range = range.to_string();
    run_blocking("Split", move || split_blocking(file, &range)).await
}

fn split_blocking(file: NamedFile, range: &str) -> Result<SplitOutput, SuiteError> {
    let pdfium = bind()?;
    let NamedFile { name, bytes } = file;
    let source = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(load_err(&name))?;
    let source_pages = source.pages().len() as usize;

    let pages = parse_page_range(range, source_pages);
    if pages.is_empty() {
        return Err(SuiteError::InvalidPageRange {
            range: range.to_string(),
            total: source_pages,
        });
    }

    let mut out = pdfium.create_new_pdf().map_err(op_err("create"))?;
    for (dest, &idx) in pages.iter().enumerate() {
        out.pages_mut()
            .copy_page_from_document(&source, idx as PdfPageIndex, dest as PdfPageIndex)
            .map_err(op_err("copy page"))?;
    }
    let bytes = out.save_to_bytes().map_err(op_err("save"))?;
    info!("Split {}: kept {}/{} pages", name, pages.len(), source_pages);

    Ok(SplitOutput {
        file: NamedFile::new(format!("Split-{name}"), bytes),
        pages,
        source_pages,
    })
}

// ── Image to PDF ─────────────────────────────────────────────────────────

/// Place each JPEG or PNG on its own page sized to the image's pixel
/// dimensions (1 px = 1 pt). Other formats are skipped with a warning.
pub async fn images_to_pdf(images: Vec<NamedFile>) -> Result<NamedFile, SuiteError> {
    if images.is_empty() {
        return Err(SuiteError::EmptyInput { what: "image list" });
    }
    run_blocking("Image-to-PDF", move || images_to_pdf_blocking(images)).await
}

fn decode_supported(file: &NamedFile) -> Option<DynamicImage> {
    match image::guess_format(&file.bytes) {
        Ok(ImageFormat::Jpeg) | Ok(ImageFormat::Png) => {}
        _ => {
            warn!("Skipping {}: only JPEG and PNG are supported", file.name);
            return None;
        }
    }
    match image::load_from_memory(&file.bytes) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!("Skipping {}: {}", file.name, e);
            None
        }
    }
}

fn images_to_pdf_blocking(images: Vec<NamedFile>) -> Result<NamedFile, SuiteError> {
    let total = images.len();
    let decoded: Vec<DynamicImage> = images.iter().filter_map(decode_supported).collect();
    if decoded.is_empty() {
        return Err(SuiteError::NoSupportedImages { total });
    }

    let pdfium = bind()?;
    let mut doc = pdfium.create_new_pdf().map_err(op_err("create"))?;
    for img in &decoded {
        let w = PdfPoints::new(img.width() as f32);
        let h = PdfPoints::new(img.height() as f32);
        let mut page = doc
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(w, h))
            .map_err(op_err("add page"))?;
        page.objects_mut()
            .create_image_object(PdfPoints::ZERO, PdfPoints::ZERO, img, Some(w), Some(h))
            .map_err(op_err("draw image"))?;
    }

    let bytes = doc.save_to_bytes().map_err(op_err("save"))?;
    info!("Built PDF from {}/{} images", decoded.len(), total);
    Ok(NamedFile::new(IMAGES_PDF_FILE_NAME, bytes))
}
