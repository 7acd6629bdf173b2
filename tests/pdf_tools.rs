//! PDF tool tests against a real pdfium library.
//!
//! Gated behind the `PDFIUM_TESTS` environment variable so they do not run
//! where no pdfium shared library is installed.
//!
//! Run with:
//!   PDFIUM_TESTS=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test pdf_tools -- --nocapture
//!
//! Input PDFs are generated on the fly with `images_to_pdf`, so no fixture
//! files are needed.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use silentsuite::{
    images_to_pdf, rasterize_pdf, split_pdf, MergeQueue, NamedFile, RasterOptions, SuiteError,
    TaskProgressCallback,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless PDFIUM_TESTS is set.
macro_rules! pdfium_skip_unless_enabled {
    () => {{
        if std::env::var("PDFIUM_TESTS").is_err() {
            println!("SKIP: set PDFIUM_TESTS=1 (and PDFIUM_LIB_PATH if needed) to run pdfium tests");
            return;
        }
    }};
}

fn solid(w: u32, h: u32, rgb: [u8; 3], format: ImageFormat, name: &str) -> NamedFile {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb)));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    NamedFile::new(name, buf.into_inner())
}

/// A PDF with one page per size in `pages`.
async fn pdf_with_pages(name: &str, pages: &[(u32, u32)]) -> NamedFile {
    let images = pages
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| solid(w, h, [200, 10 * i as u8, 40], ImageFormat::Png, "p.png"))
        .collect();
    let mut pdf = images_to_pdf(images).await.unwrap();
    pdf.name = name.to_string();
    pdf
}

async fn page_count(pdf: &NamedFile) -> usize {
    let options = RasterOptions {
        scale: 0.1,
        ..Default::default()
    };
    rasterize_pdf(pdf.clone(), &options).await.unwrap().len()
}

// ── Image to PDF ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn images_become_pages_sized_to_the_image() {
    pdfium_skip_unless_enabled!();
    let images = vec![
        solid(120, 80, [255, 0, 0], ImageFormat::Jpeg, "a.jpg"),
        NamedFile::new("notes.txt", b"skip me".to_vec()),
        solid(60, 90, [0, 0, 255], ImageFormat::Png, "b.png"),
    ];
    let pdf = images_to_pdf(images).await.unwrap();
    assert_eq!(pdf.name, "Images-to-PDF.pdf");
    assert!(pdf.bytes.starts_with(b"%PDF"));

    // Scale 1.0: one pixel per point.
    let options = RasterOptions {
        scale: 1.0,
        ..Default::default()
    };
    let pages = rasterize_pdf(pdf, &options).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!((pages[0].width, pages[0].height), (120, 80));
    assert_eq!((pages[1].width, pages[1].height), (60, 90));
}

// ── Merge ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_appends_in_queue_order_and_flushes() {
    pdfium_skip_unless_enabled!();
    let a = pdf_with_pages("a.pdf", &[(100, 100), (100, 100)]).await;
    let b = pdf_with_pages("b.pdf", &[(50, 200)]).await;

    let mut queue = MergeQueue::new();
    queue.extend([a, b]);
    let merged = queue.merge().await.unwrap();

    assert!(queue.is_empty());
    assert_eq!(merged.name, "SilentSuite-Merged.pdf");
    let options = RasterOptions {
        scale: 1.0,
        ..Default::default()
    };
    let pages = rasterize_pdf(merged, &options).await.unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!((pages[2].width, pages[2].height), (50, 200));
}

#[tokio::test]
async fn merge_failure_keeps_the_queue() {
    pdfium_skip_unless_enabled!();
    let a = pdf_with_pages("a.pdf", &[(100, 100)]).await;
    let mut queue = MergeQueue::new();
    queue.push(a);
    queue.push(NamedFile::new("broken.pdf", b"not a pdf".to_vec()));

    let err = queue.merge().await.unwrap_err();
    assert!(matches!(err, SuiteError::PdfLoad { ref name, .. } if name == "broken.pdf"));
    assert_eq!(queue.len(), 2);
}

// ── Split ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn split_keeps_selected_pages_in_order() {
    pdfium_skip_unless_enabled!();
    let src = pdf_with_pages("report.pdf", &[(10, 10), (20, 20), (30, 30), (40, 40), (50, 50)]).await;

    let out = split_pdf(src, "4, 1-2, 9").await.unwrap();
    assert_eq!(out.file.name, "Split-report.pdf");
    assert_eq!(out.pages, vec![0, 1, 3]);
    assert_eq!(out.source_pages, 5);
    assert_eq!(page_count(&out.file).await, 3);
}

#[tokio::test]
async fn split_with_no_matching_pages_fails() {
    pdfium_skip_unless_enabled!();
    let src = pdf_with_pages("short.pdf", &[(10, 10), (10, 10)]).await;
    let err = split_pdf(src, "5-9").await.unwrap_err();
    assert!(matches!(err, SuiteError::InvalidPageRange { total: 2, .. }));
}

// ── Rasterise ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct PageCounter {
    pages: AtomicUsize,
}

impl TaskProgressCallback for PageCounter {
    fn on_step_complete(&self, _step: usize, _total: usize, _bytes: usize) {
        self.pages.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn rasterise_names_pages_and_reports_progress() {
    pdfium_skip_unless_enabled!();
    let src = pdf_with_pages("deck.pdf", &[(100, 60), (100, 60)]).await;
    let counter = Arc::new(PageCounter::default());
    let options = RasterOptions {
        progress_callback: Some(counter.clone()),
        ..Default::default()
    };

    let pages = rasterize_pdf(src, &options).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].file_name, "Page-1-deck.pdf.jpg");
    assert_eq!(pages[1].page_num, 2);
    // Default scale 1.5.
    assert_eq!((pages[0].width, pages[0].height), (150, 90));
    assert!(image::load_from_memory_with_format(&pages[0].bytes, ImageFormat::Jpeg).is_ok());
    assert_eq!(counter.pages.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn corrupt_pdf_is_a_load_error() {
    pdfium_skip_unless_enabled!();
    let err = rasterize_pdf(NamedFile::new("x.pdf", b"%PDF-garbage".to_vec()), &RasterOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SuiteError::PdfLoad { .. }));
}
