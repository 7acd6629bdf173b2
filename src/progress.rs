//! Progress-callback trait for multi-step tools.
//!
//! Three operations take several sequential steps: the compressor (one
//! step per quality probe), the rasteriser (one step per page) and the
//! offline-cache install (one step per manifest asset). Each reports through
//! an [`Arc<dyn TaskProgressCallback>`], so the CLI can drive a progress bar
//! while the library stays free of any terminal code.
//!
//! # Example
//!
//! ```rust
//! use silentsuite::{CompressionConfig, TaskProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     steps: AtomicUsize,
//! }
//!
//! impl TaskProgressCallback for CountingCallback {
//!     fn on_step_complete(&self, step: usize, _total: usize, output_bytes: usize) {
//!         self.steps.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("step {step}: {output_bytes} bytes");
//!     }
//! }
//!
//! let config = CompressionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { steps: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by multi-step tools as they progress.
///
/// All methods default to no-ops so callers only override what they need.
/// `total_steps` is an upper bound: the compressor may stop early once a
/// probe lands inside the tolerance band.
pub trait TaskProgressCallback: Send + Sync {
    /// Called once before the first step.
    fn on_task_start(&self, task: &str, total_steps: usize) {
        let _ = (task, total_steps);
    }

    /// Called just before step `step` (1-indexed) begins.
    fn on_step_start(&self, step: usize, total_steps: usize) {
        let _ = (step, total_steps);
    }

    /// Called when a step produced `output_bytes` bytes.
    fn on_step_complete(&self, step: usize, total_steps: usize, output_bytes: usize) {
        let _ = (step, total_steps, output_bytes);
    }

    /// Called once after the last step; `completed_steps` may be below the bound.
    fn on_task_complete(&self, task: &str, completed_steps: usize) {
        let _ = (task, completed_steps);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TaskProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn TaskProgressCallback>;
