//! The install-time asset manifest.

use crate::error::SuiteError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;
use url::Url;

/// Assets every generation pre-caches: the app shell plus the CDN libraries
/// the tools load at runtime.
pub const DEFAULT_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./style.css",
    "./script.js",
    "./manifest.json",
    "https://cdn.tailwindcss.com",
    "https://fonts.googleapis.com/css2?family=Plus+Jakarta+Sans:wght@400;500;600;700;800&display=swap",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
    "https://unpkg.com/pdf-lib/dist/pdf-lib.min.js",
    "https://cdnjs.cloudflare.com/ajax/libs/pdf.js/3.4.120/pdf.min.js",
    "https://cdnjs.cloudflare.com/ajax/libs/pdf.js/3.4.120/pdf.worker.min.js",
    "https://cdn.jsdelivr.net/npm/browser-image-compression@2.0.0/dist/browser-image-compression.js",
    "https://cdnjs.cloudflare.com/ajax/libs/qrcodejs/1.0.0/qrcode.min.js",
];

/// Relative path of the document served when navigation fails offline.
pub const ROOT_DOCUMENT: &str = "./index.html";

/// Ordered list of asset URLs, absolute or relative to the scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub assets: Vec<String>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AssetManifest {
    pub fn new(assets: Vec<String>) -> Self {
        Self { assets }
    }

    /// Parse `{"assets": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, SuiteError> {
        serde_json::from_str(json)
            .map_err(|e| SuiteError::InvalidConfig(format!("manifest JSON: {e}")))
    }

    pub async fn from_file(path: &Path) -> Result<Self, SuiteError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|_| {
            SuiteError::FileNotFound {
                path: path.to_path_buf(),
            }
        })?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Resolve every entry against `scope`, dropping repeated URLs.
    pub fn resolve(&self, scope: &Url) -> Result<Vec<Url>, SuiteError> {
        let mut out: Vec<Url> = Vec::with_capacity(self.assets.len());
        for entry in &self.assets {
            let url = scope.join(entry).map_err(|e| SuiteError::InvalidUrl {
                input: entry.clone(),
                reason: e.to_string(),
            })?;
            if out.contains(&url) {
                warn!("Manifest lists '{}' more than once; keeping the first", url);
                continue;
            }
            out.push(url);
        }
        Ok(out)
    }
}
