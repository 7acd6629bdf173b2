//! # silentsuite
//!
//! Local-first file tools with an offline asset cache.
//!
//! Everything runs on the caller's machine: no file leaves the process.
//!
//! ## What's inside
//!
//! ```text
//! compress   size-targeted lossy compression (quality bisection, ≤ 8 probes)
//! offline    generation-tagged asset cache: install → activate → serve
//! tools      PDF merge / split / image-to-PDF / rasterise, JPEG⇄PNG,
//!            meme captions, QR codes, passwords, unit conversion
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use silentsuite::{compress_image, CompressionConfig, TargetSize};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("photo.png")?;
//!     let target: TargetSize = "500KB".parse()?;
//!     let outcome = compress_image(&bytes, target, &CompressionConfig::default()).await?;
//!     eprintln!(
//!         "{} bytes at q={:.2} after {} probes (within tolerance: {})",
//!         outcome.image.size(),
//!         outcome.image.quality,
//!         outcome.probes,
//!         outcome.accepted
//!     );
//!     std::fs::write("photo-small.jpg", &outcome.image.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Offline cache
//!
//! ```rust,no_run
//! use silentsuite::{CacheRequest, DiskCacheStorage, OfflineCache, OfflineConfig, RequestMode};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), silentsuite::SuiteError> {
//! let config = OfflineConfig::builder()
//!     .scope("https://tools.example/")
//!     .generation("v2")
//!     .build()?;
//! let scope = config.scope.clone();
//! let cache = OfflineCache::with_http(config, Arc::new(DiskCacheStorage::new("./cache")))?;
//! cache.start().await?;
//!
//! let request = CacheRequest::parse("tools", &scope, RequestMode::Navigate)?;
//! let page = cache.handle_fetch(&request).await?;
//! println!("{} via {:?}", page.response.status, page.source);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `silentsuite` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! PDF tools need a pdfium shared library at runtime; see [`pdfium`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compress;
pub mod config;
pub mod error;
pub mod offline;
pub mod pdfium;
pub mod progress;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compress::{
    compress_image, compress_to_target, CompressionOutcome, CompressionTarget, EncodedImage,
    ImageEncoder, JpegQualityEncoder, TargetSize,
};
pub use config::{CompressionConfig, CompressionConfigBuilder, OfflineConfig, OfflineConfigBuilder};
pub use error::SuiteError;
pub use offline::{
    ActivationReport, AssetManifest, CacheRequest, CacheStorage, CachedResponse, DiskCacheStorage,
    FetchOutcome, Fetcher, HttpFetcher, InstallReport, LifecycleState, MemoryCacheStorage,
    OfflineCache, RequestMode, ResponseSource, ResponseType,
};
pub use progress::{NoopProgressCallback, ProgressCallback, TaskProgressCallback};
pub use tools::{
    convert_image, convert_units, generate_meme, generate_password, generate_qr, images_to_pdf,
    merge_pdfs, parse_page_range, rasterize_pdf, split_pdf, ImageFormatTarget, MemeOutput, MEME_FILE_NAME,
    MergeQueue, NamedFile, RasterOptions, UnitCategory,
};
