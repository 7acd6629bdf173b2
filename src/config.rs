//! Configuration types for the compressor and the offline cache manager.
//!
//! Both configs follow the same shape: a plain struct with documented
//! defaults, plus a builder whose `build()` validates the few constraints
//! the algorithms rely on.

use crate::error::SuiteError;
use crate::offline::manifest::AssetManifest;
use crate::progress::ProgressCallback;
use std::fmt;
use url::Url;

/// Configuration for [`crate::compress::compress_to_target`].
///
/// # Example
/// ```rust
/// use silentsuite::CompressionConfig;
///
/// let config = CompressionConfig::builder()
///     .max_iterations(6)
///     .tolerance_ratio(0.05)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_iterations, 6);
/// ```
#[derive(Clone)]
pub struct CompressionConfig {
    /// Probe budget for the bisection loop. Default: 8.
    pub max_iterations: u32,

    /// Acceptance band as a fraction of the target size. Default: 0.08.
    ///
    /// A probe is accepted when `|size - target| <= target * tolerance_ratio`.
    pub tolerance_ratio: f64,

    /// Lower bound of the quality search interval. Default: 0.1.
    pub min_quality: f32,

    /// Upper bound of the quality search interval. Default: 1.0.
    pub max_quality: f32,

    /// Longest edge, in pixels, of the raster fed to the encoder. Default: 1920.
    ///
    /// Larger sources are downscaled (aspect preserved) once, before the
    /// first probe. `None` keeps the original dimensions.
    pub max_dimension: Option<u32>,

    /// Receives one step per probe.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            tolerance_ratio: 0.08,
            min_quality: 0.1,
            max_quality: 1.0,
            max_dimension: Some(1920),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CompressionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionConfig")
            .field("max_iterations", &self.max_iterations)
            .field("tolerance_ratio", &self.tolerance_ratio)
            .field("min_quality", &self.min_quality)
            .field("max_quality", &self.max_quality)
            .field("max_dimension", &self.max_dimension)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TaskProgressCallback>"),
            )
            .finish()
    }
}

impl CompressionConfig {
    /// Create a new builder for `CompressionConfig`.
    pub fn builder() -> CompressionConfigBuilder {
        CompressionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CompressionConfig`].
#[derive(Debug)]
pub struct CompressionConfigBuilder {
    config: CompressionConfig,
}

impl CompressionConfigBuilder {
    pub fn max_iterations(mut self, n: u32) -> Self {
        self.config.max_iterations = n;
        self
    }

    pub fn tolerance_ratio(mut self, ratio: f64) -> Self {
        self.config.tolerance_ratio = ratio;
        self
    }

    pub fn quality_bounds(mut self, min: f32, max: f32) -> Self {
        self.config.min_quality = min;
        self.config.max_quality = max;
        self
    }

    pub fn max_dimension(mut self, px: Option<u32>) -> Self {
        self.config.max_dimension = px;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CompressionConfig, SuiteError> {
        let c = &self.config;
        if c.max_iterations == 0 {
            return Err(SuiteError::InvalidConfig(
                "max_iterations must be ≥ 1".into(),
            ));
        }
        if !(c.tolerance_ratio > 0.0 && c.tolerance_ratio <= 1.0) {
            return Err(SuiteError::InvalidConfig(format!(
                "tolerance_ratio must be in (0, 1], got {}",
                c.tolerance_ratio
            )));
        }
        let in_unit = |q: f32| (0.0..=1.0).contains(&q);
        if !in_unit(c.min_quality) || !in_unit(c.max_quality) || c.min_quality > c.max_quality {
            return Err(SuiteError::InvalidConfig(format!(
                "quality bounds must satisfy 0 ≤ min ≤ max ≤ 1, got [{}, {}]",
                c.min_quality, c.max_quality
            )));
        }
        if c.max_dimension == Some(0) {
            return Err(SuiteError::InvalidConfig(
                "max_dimension must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Offline cache ────────────────────────────────────────────────────────

/// Default scope used when none is configured.
pub const DEFAULT_SCOPE: &str = "http://localhost:8080/";

/// Default cache-name prefix; the generation tag is appended to it.
pub const DEFAULT_CACHE_PREFIX: &str = "silentsuite";

/// Configuration for [`crate::offline::OfflineCache`].
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Base URL the manifest's relative entries resolve against. Always ends in `/`.
    pub scope: Url,

    /// Partition-name prefix. Default: `"silentsuite"`.
    pub cache_prefix: String,

    /// Generation tag. Default: `v{CARGO_PKG_VERSION}`.
    ///
    /// The partition name is `{cache_prefix}-{generation}`; changing the tag
    /// is what makes the next activation evict the old partition.
    pub generation: String,

    /// Assets fetched at install time.
    pub manifest: AssetManifest,

    /// Activate straight after a successful install. Default: true.
    pub skip_waiting: bool,

    /// Timeout of the HTTP fetch primitive in seconds. Default: None (the
    /// request waits as long as the connection stays open).
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            scope: Url::parse(DEFAULT_SCOPE).expect("DEFAULT_SCOPE is a valid URL"),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            generation: format!("v{}", env!("CARGO_PKG_VERSION")),
            manifest: AssetManifest::default(),
            skip_waiting: true,
            fetch_timeout_secs: None,
        }
    }
}

impl OfflineConfig {
    /// Create a new builder for `OfflineConfig`.
    pub fn builder() -> OfflineConfigBuilder {
        OfflineConfigBuilder {
            scope: None,
            config: Self::default(),
        }
    }

    /// Name of the partition that belongs to this generation.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.generation)
    }
}

/// Builder for [`OfflineConfig`].
#[derive(Debug)]
pub struct OfflineConfigBuilder {
    scope: Option<String>,
    config: OfflineConfig,
}

impl OfflineConfigBuilder {
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.cache_prefix = prefix.into();
        self
    }

    pub fn generation(mut self, tag: impl Into<String>) -> Self {
        self.config.generation = tag.into();
        self
    }

    pub fn manifest(mut self, manifest: AssetManifest) -> Self {
        self.config.manifest = manifest;
        self
    }

    pub fn skip_waiting(mut self, v: bool) -> Self {
        self.config.skip_waiting = v;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = Some(secs);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<OfflineConfig, SuiteError> {
        if let Some(raw) = self.scope.take() {
            self.config.scope = parse_scope(&raw)?;
        }
        let valid_name = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid_name(&self.config.cache_prefix) {
            return Err(SuiteError::InvalidConfig(format!(
                "cache prefix '{}' must be non-empty [A-Za-z0-9._-]",
                self.config.cache_prefix
            )));
        }
        if !valid_name(&self.config.generation) {
            return Err(SuiteError::InvalidConfig(format!(
                "generation '{}' must be non-empty [A-Za-z0-9._-]",
                self.config.generation
            )));
        }
        if self.config.fetch_timeout_secs == Some(0) {
            return Err(SuiteError::InvalidConfig(
                "fetch timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Parse a scope URL, forcing a trailing slash so `./x` joins under it.
fn parse_scope(raw: &str) -> Result<Url, SuiteError> {
    let mut url = Url::parse(raw).map_err(|e| SuiteError::InvalidUrl {
        input: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(SuiteError::InvalidUrl {
            input: raw.to_string(),
            reason: "scope must be a hierarchical http(s) URL".into(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_defaults_match_tool() {
        let c = CompressionConfig::default();
        assert_eq!(c.max_iterations, 8);
        assert!((c.tolerance_ratio - 0.08).abs() < f64::EPSILON);
        assert_eq!(c.min_quality, 0.1);
        assert_eq!(c.max_quality, 1.0);
        assert_eq!(c.max_dimension, Some(1920));
    }

    #[test]
    fn compression_rejects_bad_bounds() {
        assert!(CompressionConfig::builder()
            .quality_bounds(0.9, 0.2)
            .build()
            .is_err());
        assert!(CompressionConfig::builder().max_iterations(0).build().is_err());
        assert!(CompressionConfig::builder()
            .tolerance_ratio(0.0)
            .build()
            .is_err());
    }

    #[test]
    fn scope_gets_trailing_slash() {
        let c = OfflineConfig::builder()
            .scope("https://example.github.io/silentsuite")
            .build()
            .unwrap();
        assert_eq!(c.scope.as_str(), "https://example.github.io/silentsuite/");
        assert_eq!(
            c.scope.join("./index.html").unwrap().as_str(),
            "https://example.github.io/silentsuite/index.html"
        );
    }

    #[test]
    fn cache_name_embeds_generation() {
        let c = OfflineConfig::builder().generation("v7").build().unwrap();
        assert_eq!(c.cache_name(), "silentsuite-v7");
    }

    #[test]
    fn fetch_timeout_is_opt_in() {
        assert_eq!(OfflineConfig::default().fetch_timeout_secs, None);
        let c = OfflineConfig::builder().fetch_timeout_secs(10).build().unwrap();
        assert_eq!(c.fetch_timeout_secs, Some(10));
        assert!(OfflineConfig::builder().fetch_timeout_secs(0).build().is_err());
    }

    #[test]
    fn rejects_unsafe_generation() {
        assert!(OfflineConfig::builder()
            .generation("../etc")
            .build()
            .is_err());
    }
}
