//! Error type for the silentsuite library.
//!
//! Every tool is a single-shot transformation, so there is one fatal error
//! enum, [`SuiteError`]. Nothing is retried: an operation either returns
//! its full result or one of these errors. The only "best effort" path in
//! the crate is the compressor's iteration budget, which is a normal
//! `Ok` outcome, not an error.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the silentsuite library.
#[derive(Debug, Error)]
pub enum SuiteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// A required text input was empty.
    #[error("{what} must not be empty")]
    EmptyInput { what: &'static str },

    /// The target size string or number could not be used.
    #[error("Invalid target size '{input}': {reason}")]
    InvalidTarget { input: String, reason: String },

    /// A unit conversion named a category or unit that does not exist.
    #[error("Unknown unit '{unit}' for category '{category}'")]
    UnknownUnit { category: String, unit: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// Source bytes are not a decodable raster image.
    #[error("Could not decode image: {detail}")]
    ImageDecode { detail: String },

    /// The encoder failed while producing a probe or an output image.
    #[error("Image encoding failed: {detail}")]
    ImageEncode { detail: String },

    /// Image-to-PDF received only unsupported formats.
    #[error("None of the {total} inputs is a JPEG or PNG image")]
    NoSupportedImages { total: usize },

    /// Caption font bytes are not a usable TrueType/OpenType face.
    #[error("Invalid font: {detail}\nPass a .ttf or .otf file.")]
    InvalidFont { detail: String },

    /// QR generation rejected the payload (usually too long for level H).
    #[error("QR code generation failed: {detail}")]
    QrFailed { detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// A PDF could not be opened (corrupt or password protected).
    #[error("PDF '{name}' could not be loaded: {detail}\nMake sure the file is not password protected.")]
    PdfLoad { name: String, detail: String },

    /// A PDF operation (copy, create, save) failed inside pdfium.
    #[error("PDF operation '{operation}' failed: {detail}")]
    PdfOperation { operation: &'static str, detail: String },

    /// A page range selected no pages of the document.
    #[error("Page range '{range}' selects no pages (document has {total} pages). Example: 1-5, 8")]
    InvalidPageRange { range: String, total: usize },

    /// A merge was requested with fewer than two queued files.
    #[error("At least 2 PDF files are required to merge, got {count}")]
    NotEnoughFiles { count: usize },

    /// Rendering a page to a bitmap failed.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Cache / network errors ────────────────────────────────────────────
    /// The fetch primitive failed before any response was received.
    #[error("Network request for '{url}' failed: {reason}")]
    Network { url: String, reason: String },

    /// The fetch primitive gave up after its timeout.
    #[error("Network request for '{url}' timed out after {secs}s")]
    NetworkTimeout { url: String, secs: u64 },

    /// A manifest asset did not resolve with an ok status during install.
    #[error("Install of '{cache}' aborted: '{url}' answered HTTP {status}")]
    InstallAssetRejected {
        cache: String,
        url: String,
        status: u16,
    },

    /// A lifecycle step was called in the wrong state.
    #[error("Cannot {action} while the offline cache is {state}")]
    InvalidLifecycle {
        action: &'static str,
        state: &'static str,
    },

    /// A request or manifest entry is not a usable URL.
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    /// The persistent cache store failed.
    #[error("Cache storage error in '{partition}': {detail}")]
    Storage { partition: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SuiteError {
    /// True when the error came from the fetch primitive itself rather than
    /// from the cache store; navigation fallback only applies to these.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            SuiteError::Network { .. } | SuiteError::NetworkTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_range_display() {
        let e = SuiteError::InvalidPageRange {
            range: "9-12".into(),
            total: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("9-12"), "got: {msg}");
        assert!(msg.contains("4 pages"), "got: {msg}");
    }

    #[test]
    fn install_rejected_display() {
        let e = SuiteError::InstallAssetRejected {
            cache: "silentsuite-v2".into(),
            url: "https://cdn.example/lib.js".into(),
            status: 404,
        };
        let msg = e.to_string();
        assert!(msg.contains("silentsuite-v2"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn network_classification() {
        assert!(SuiteError::Network {
            url: "x".into(),
            reason: "offline".into()
        }
        .is_network());
        assert!(SuiteError::NetworkTimeout {
            url: "x".into(),
            secs: 3
        }
        .is_network());
        assert!(!SuiteError::Storage {
            partition: "p".into(),
            detail: "disk full".into()
        }
        .is_network());
    }

    #[test]
    fn not_enough_files_display() {
        let e = SuiteError::NotEnoughFiles { count: 1 };
        assert!(e.to_string().contains("got 1"));
    }
}
