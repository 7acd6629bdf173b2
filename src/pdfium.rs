//! pdfium binding shared by the PDF tools.
//!
//! Resolution order:
//! 1. `PDFIUM_LIB_PATH`, when set and the file exists.
//! 2. The platform library name in the current working directory.
//! 3. The system library.
//!
//! The returned handle is not shared across calls; every PDF operation binds
//! inside its own `spawn_blocking` closure and drops the handle when done.

use crate::error::SuiteError;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

pub(crate) fn bind() -> Result<Pdfium, SuiteError> {
    if let Ok(env_path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            debug!("Binding pdfium from {}={}", PDFIUM_LIB_PATH_ENV, path.display());
            return Pdfium::bind_to_library(&path)
                .map(Pdfium::new)
                .map_err(|e| {
                    SuiteError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
                });
        }
        warn!(
            "{} '{}' does not exist; trying the working directory",
            PDFIUM_LIB_PATH_ENV, env_path
        );
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    let bindings = Pdfium::bind_to_library(&local)
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| SuiteError::PdfiumBindingFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

/// Map a pdfium failure on an already-loaded document.
pub(crate) fn op_err(operation: &'static str) -> impl Fn(PdfiumError) -> SuiteError {
    move |e| SuiteError::PdfOperation {
        operation,
        detail: format!("{e:?}"),
    }
}

/// Map a document load failure, naming the input.
pub(crate) fn load_err(name: &str) -> impl Fn(PdfiumError) -> SuiteError + '_ {
    move |e| {
        let detail = format!("{e:?}");
        let detail = if detail.contains("Password") || detail.contains("password") {
            "document is password protected".to_string()
        } else {
            detail
        };
        SuiteError::PdfLoad {
            name: name.to_string(),
            detail,
        }
    }
}
