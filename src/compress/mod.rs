//! Size-targeted image compression by bisection over encoder quality.
//!
//! ## Algorithm
//!
//! ```text
//! low = 0.1, high = 1.0
//! repeat max_iterations times:
//!     q    = (low + high) / 2
//!     out  = encode(image, q)
//!     keep out if |out - target| is strictly the smallest so far
//!     stop if |out - target| <= target * 0.08     ← accept this probe
//!     out > target ? high = q : low = q
//! return the closest probe
//! ```
//!
//! The acceptance test is one-sided on the absolute difference, and an
//! accepted probe wins even when an earlier probe was closer: "good enough,
//! stop now" rather than strict minimisation.

pub mod encoder;

use crate::config::CompressionConfig;
use crate::error::SuiteError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

pub use encoder::{encode_jpeg, EncodedImage, ImageEncoder, JpegQualityEncoder};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ── Target size ──────────────────────────────────────────────────────────

static TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([0-9]*\.?[0-9]+)\s*(kb|mb)?\s*$").expect("target regex compiles")
});

/// A user-facing size target, as entered in the tool: a number plus unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetSize {
    Kilobytes(f64),
    Megabytes(f64),
}

impl TargetSize {
    /// The target in megabytes (`KB / 1024`).
    pub fn as_megabytes(&self) -> f64 {
        match *self {
            TargetSize::Kilobytes(kb) => kb / 1024.0,
            TargetSize::Megabytes(mb) => mb,
        }
    }
}

impl FromStr for TargetSize {
    type Err = SuiteError;

    /// Parse `"500KB"`, `"1.5 mb"` or a bare number (megabytes).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TARGET_RE.captures(s).ok_or_else(|| SuiteError::InvalidTarget {
            input: s.to_string(),
            reason: "expected a number optionally followed by KB or MB".into(),
        })?;
        let value: f64 = caps[1].parse().map_err(|_| SuiteError::InvalidTarget {
            input: s.to_string(),
            reason: "not a number".into(),
        })?;
        let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
        Ok(match unit.as_deref() {
            Some("kb") => TargetSize::Kilobytes(value),
            _ => TargetSize::Megabytes(value),
        })
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSize::Kilobytes(kb) => write!(f, "{kb}KB"),
            TargetSize::Megabytes(mb) => write!(f, "{mb}MB"),
        }
    }
}

/// Byte target plus acceptance band for one compression call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionTarget {
    pub target_bytes: f64,
    pub tolerance_ratio: f64,
}

impl CompressionTarget {
    /// Build a target from megabytes. `target_mb` must be positive and finite.
    pub fn from_megabytes(target_mb: f64, tolerance_ratio: f64) -> Result<Self, SuiteError> {
        if !(target_mb.is_finite() && target_mb > 0.0) {
            return Err(SuiteError::InvalidTarget {
                input: target_mb.to_string(),
                reason: "target size must be greater than zero".into(),
            });
        }
        Ok(Self {
            target_bytes: target_mb * BYTES_PER_MB,
            tolerance_ratio,
        })
    }

    pub fn tolerance_bytes(&self) -> f64 {
        self.target_bytes * self.tolerance_ratio
    }

    /// Absolute byte distance from the target.
    pub fn distance(&self, size: usize) -> f64 {
        (size as f64 - self.target_bytes).abs()
    }

    pub fn accepts(&self, size: usize) -> bool {
        self.distance(size) <= self.tolerance_bytes()
    }
}

// ── Search state ─────────────────────────────────────────────────────────

/// Mutable state of one bisection run. `low <= high` holds throughout.
#[derive(Debug, Clone)]
pub struct BisectionState {
    pub low: f32,
    pub high: f32,
    pub best: Option<EncodedImage>,
    pub iterations_remaining: u32,
}

impl BisectionState {
    pub fn new(low: f32, high: f32, iterations: u32) -> Self {
        Self {
            low,
            high,
            best: None,
            iterations_remaining: iterations,
        }
    }

    /// Midpoint of the current interval: the next quality to probe.
    pub fn next_quality(&self) -> f32 {
        (self.low + self.high) / 2.0
    }

    /// Keep `probe` if it beats the best candidate so far.
    fn consider(&mut self, probe: &EncodedImage, target: &CompressionTarget) {
        let better = match &self.best {
            None => true,
            Some(best) => target.distance(probe.size()) < target.distance(best.size()),
        };
        if better {
            self.best = Some(probe.clone());
        }
    }

    /// Narrow the interval around `quality` given the probe's size.
    fn narrow(&mut self, quality: f32, size: usize, target: &CompressionTarget) {
        if size as f64 > target.target_bytes {
            self.high = quality;
        } else {
            self.low = quality;
        }
    }
}

/// Result of [`compress_to_target`].
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    /// The chosen encoding.
    pub image: EncodedImage,
    /// Number of encoder calls made.
    pub probes: u32,
    /// True when the chosen probe fell inside the tolerance band.
    pub accepted: bool,
    /// The byte target searched for.
    pub target_bytes: f64,
}

/// Bisect encoder quality until the output lands within tolerance of the
/// target, or the probe budget runs out.
///
/// Encoder errors abort immediately; no partial result is returned on that
/// path. Running out of probes is not an error: the closest probe is returned
/// with `accepted == false`.
pub async fn compress_to_target<E: ImageEncoder>(
    encoder: &E,
    image: &E::Image,
    target: &CompressionTarget,
    config: &CompressionConfig,
) -> Result<CompressionOutcome, SuiteError> {
    let budget = config.max_iterations;
    let mut state = BisectionState::new(config.min_quality, config.max_quality, budget);
    let mut probes = 0u32;

    if let Some(ref cb) = config.progress_callback {
        cb.on_task_start("compress", budget as usize);
    }

    while state.iterations_remaining > 0 {
        state.iterations_remaining -= 1;
        probes += 1;
        let quality = state.next_quality();

        if let Some(ref cb) = config.progress_callback {
            cb.on_step_start(probes as usize, budget as usize);
        }
        let probe = encoder.encode(image, quality).await?;
        let size = probe.size();
        if let Some(ref cb) = config.progress_callback {
            cb.on_step_complete(probes as usize, budget as usize, size);
        }
        debug!(
            "Probe {}/{}: q={:.4} → {} bytes (target {:.0})",
            probes, budget, quality, size, target.target_bytes
        );

        if target.accepts(size) {
            info!("Accepted q={:.4} ({} bytes) after {} probes", quality, size, probes);
            if let Some(ref cb) = config.progress_callback {
                cb.on_task_complete("compress", probes as usize);
            }
            return Ok(CompressionOutcome {
                image: probe,
                probes,
                accepted: true,
                target_bytes: target.target_bytes,
            });
        }

        state.consider(&probe, target);
        state.narrow(quality, size, target);
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_task_complete("compress", probes as usize);
    }

    // max_iterations >= 1 is enforced by the config builder, but a struct
    // literal can still carry 0.
    let best = state.best.ok_or_else(|| {
        SuiteError::InvalidConfig("max_iterations must be ≥ 1".into())
    })?;
    info!(
        "Probe budget exhausted; closest q={:.4} ({} bytes)",
        best.quality,
        best.size()
    );
    Ok(CompressionOutcome {
        image: best,
        probes,
        accepted: false,
        target_bytes: target.target_bytes,
    })
}

/// Compress encoded image bytes toward `target` as JPEG.
///
/// Decodes the source, caps its longest edge at `config.max_dimension`, then
/// runs [`compress_to_target`] with [`JpegQualityEncoder`].
pub async fn compress_image(
    bytes: &[u8],
    target: TargetSize,
    config: &CompressionConfig,
) -> Result<CompressionOutcome, SuiteError> {
    let target = CompressionTarget::from_megabytes(target.as_megabytes(), config.tolerance_ratio)?;
    let src = bytes.to_vec();
    let max_dimension = config.max_dimension;
    let prepared = tokio::task::spawn_blocking(move || {
        JpegQualityEncoder::prepare(&src, max_dimension)
    })
    .await
    .map_err(|e| SuiteError::Internal(format!("Decode task panicked: {}", e)))??;

    info!(
        "Compressing {} source bytes toward {:.0} bytes",
        bytes.len(),
        target.target_bytes
    );
    compress_to_target(&JpegQualityEncoder, &prepared, &target, config).await
}
