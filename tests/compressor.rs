//! Integration tests for the size-targeted compressor.
//!
//! Most tests drive `compress_to_target` with a scripted encoder whose output
//! size is an exact function of quality, so the bisection path is fully
//! predictable. The last test runs the real JPEG encoder on a synthetic image.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use silentsuite::{
    compress_image, compress_to_target, CompressionConfig, CompressionTarget, EncodedImage,
    ImageEncoder, SuiteError, TargetSize, TaskProgressCallback,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const MB: f64 = 1024.0 * 1024.0;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Encoder whose output is `size_of(quality)` zero bytes. Records every probe.
struct ScriptedEncoder<F: Fn(f32) -> usize + Send + Sync> {
    size_of: F,
    probes: Mutex<Vec<f32>>,
    fail_on_probe: Option<usize>,
}

impl<F: Fn(f32) -> usize + Send + Sync> ScriptedEncoder<F> {
    fn new(size_of: F) -> Self {
        Self {
            size_of,
            probes: Mutex::new(Vec::new()),
            fail_on_probe: None,
        }
    }

    fn qualities(&self) -> Vec<f32> {
        self.probes.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F: Fn(f32) -> usize + Send + Sync> ImageEncoder for ScriptedEncoder<F> {
    type Image = ();

    async fn encode(&self, _image: &(), quality: f32) -> Result<EncodedImage, SuiteError> {
        let n = {
            let mut probes = self.probes.lock().unwrap();
            probes.push(quality);
            probes.len()
        };
        if self.fail_on_probe == Some(n) {
            return Err(SuiteError::ImageEncode {
                detail: "scripted failure".into(),
            });
        }
        Ok(EncodedImage {
            bytes: vec![0u8; (self.size_of)(quality)],
            quality,
        })
    }
}

fn one_mb_target() -> CompressionTarget {
    CompressionTarget::from_megabytes(1.0, 0.08).unwrap()
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

// ── Acceptance ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_probe_within_tolerance_wins_immediately() {
    // 1.02 MB at the first midpoint (0.55): inside the ±8% band.
    let encoder = ScriptedEncoder::new(|q| if approx(q, 0.55) { (1.02 * MB) as usize } else { 1 });
    let outcome = compress_to_target(&encoder, &(), &one_mb_target(), &CompressionConfig::default())
        .await
        .unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.probes, 1);
    assert_eq!(encoder.qualities().len(), 1);
    assert_eq!(outcome.image.size(), (1.02 * MB) as usize);
}

#[tokio::test]
async fn second_probe_in_band_ends_the_search() {
    // Probe 1 (0.55) is far too big, probe 2 (0.325) is inside the band.
    let encoder = ScriptedEncoder::new(|q| {
        if approx(q, 0.55) {
            (3.0 * MB) as usize
        } else {
            (0.95 * MB) as usize
        }
    });
    let outcome = compress_to_target(&encoder, &(), &one_mb_target(), &CompressionConfig::default())
        .await
        .unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.probes, 2);
    assert!(approx(outcome.image.quality, 0.325));
}

// ── Budget exhaustion ────────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_target_uses_exact_bisection_and_returns_closest() {
    // Always 10x too large: every probe moves `high` down.
    let encoder = ScriptedEncoder::new(|q| ((q as f64) * 10.0 * MB) as usize + (10.0 * MB) as usize);
    let outcome = compress_to_target(&encoder, &(), &one_mb_target(), &CompressionConfig::default())
        .await
        .unwrap();

    assert!(!outcome.accepted);
    assert_eq!(outcome.probes, 8);

    let qs = encoder.qualities();
    assert_eq!(qs.len(), 8);
    let low = 0.1f32;
    let mut high = 1.0f32;
    for &q in &qs {
        assert!(approx(q, (low + high) / 2.0), "probe {q} is not the midpoint of [{low}, {high}]");
        high = q;
    }

    // Smallest output is closest; it came from the lowest quality probed.
    let min_q = qs.iter().cloned().fold(f32::INFINITY, f32::min);
    assert!(approx(outcome.image.quality, min_q));
}

#[tokio::test]
async fn too_small_everywhere_climbs_and_keeps_largest() {
    // Always under target: every probe moves `low` up.
    let encoder = ScriptedEncoder::new(|q| (q as f64 * 100_000.0) as usize);
    let config = CompressionConfig::builder().max_iterations(5).build().unwrap();
    let outcome = compress_to_target(&encoder, &(), &one_mb_target(), &config)
        .await
        .unwrap();

    assert!(!outcome.accepted);
    assert_eq!(outcome.probes, 5);
    let qs = encoder.qualities();
    assert!(qs.windows(2).all(|w| w[1] > w[0]), "qualities must increase: {qs:?}");
    let max_q = qs.iter().cloned().fold(f32::MIN, f32::max);
    assert!(approx(outcome.image.quality, max_q));
}

#[tokio::test]
async fn ties_keep_the_earlier_candidate() {
    // Two probes equidistant from the target (one over, one under).
    let encoder = ScriptedEncoder::new(|q| {
        if approx(q, 0.55) {
            (2.0 * MB) as usize
        } else {
            0
        }
    });
    let config = CompressionConfig::builder().max_iterations(2).build().unwrap();
    let outcome = compress_to_target(&encoder, &(), &one_mb_target(), &config)
        .await
        .unwrap();
    assert!(approx(outcome.image.quality, 0.55));
}

// ── Determinism and failure ──────────────────────────────────────────────────

#[tokio::test]
async fn deterministic_encoder_gives_identical_results() {
    let size_of = |q: f32| ((q as f64).powi(2) * 4.0 * MB) as usize;
    let a = compress_to_target(
        &ScriptedEncoder::new(size_of),
        &(),
        &one_mb_target(),
        &CompressionConfig::default(),
    )
    .await
    .unwrap();
    let b = compress_to_target(
        &ScriptedEncoder::new(size_of),
        &(),
        &one_mb_target(),
        &CompressionConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(a.image, b.image);
    assert_eq!(a.probes, b.probes);
}

#[tokio::test]
async fn encoder_error_aborts_the_search() {
    let mut encoder = ScriptedEncoder::new(|_| (5.0 * MB) as usize);
    encoder.fail_on_probe = Some(3);
    let err = compress_to_target(&encoder, &(), &one_mb_target(), &CompressionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SuiteError::ImageEncode { .. }));
    assert_eq!(encoder.qualities().len(), 3);
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingCallback {
    total: AtomicUsize,
    steps: AtomicUsize,
    completed: AtomicUsize,
}

impl TaskProgressCallback for CountingCallback {
    fn on_task_start(&self, _task: &str, total_steps: usize) {
        self.total.store(total_steps, Ordering::SeqCst);
    }
    fn on_step_complete(&self, _step: usize, _total: usize, _bytes: usize) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }
    fn on_task_complete(&self, _task: &str, completed_steps: usize) {
        self.completed.store(completed_steps, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_reports_one_step_per_probe() {
    let cb = Arc::new(CountingCallback::default());
    let config = CompressionConfig::builder()
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let encoder = ScriptedEncoder::new(|q| if q < 0.3 { (1.0 * MB) as usize } else { (4.0 * MB) as usize });
    let outcome = compress_to_target(&encoder, &(), &one_mb_target(), &config)
        .await
        .unwrap();

    assert_eq!(cb.total.load(Ordering::SeqCst), 8);
    assert_eq!(cb.steps.load(Ordering::SeqCst), outcome.probes as usize);
    assert_eq!(cb.completed.load(Ordering::SeqCst), outcome.probes as usize);
}

// ── Real JPEG path ───────────────────────────────────────────────────────────

fn noisy_png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(w, h, |x, y| {
        let v = x.wrapping_mul(2_654_435_761).wrapping_add(y.wrapping_mul(40_503)) ^ (x * y);
        Rgb([(v & 0xff) as u8, ((v >> 8) & 0xff) as u8, ((v >> 16) & 0xff) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn compress_image_produces_a_decodable_jpeg_within_budget() {
    let png = noisy_png(400, 300);
    let outcome = compress_image(&png, TargetSize::Kilobytes(40.0), &CompressionConfig::default())
        .await
        .unwrap();

    assert!(outcome.probes >= 1 && outcome.probes <= 8);
    assert_eq!(outcome.target_bytes, 40.0 * 1024.0);
    let decoded = image::load_from_memory_with_format(&outcome.image.bytes, ImageFormat::Jpeg)
        .unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 300));
}

#[tokio::test]
async fn compress_image_caps_dimensions() {
    let png = noisy_png(300, 100);
    let config = CompressionConfig::builder()
        .max_dimension(Some(150))
        .max_iterations(2)
        .build()
        .unwrap();
    let outcome = compress_image(&png, TargetSize::Kilobytes(10.0), &config)
        .await
        .unwrap();
    let decoded = image::load_from_memory(&outcome.image.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (150, 50));
}

#[tokio::test]
async fn compress_image_rejects_garbage_and_zero_targets() {
    let err = compress_image(b"nope", TargetSize::Megabytes(1.0), &CompressionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SuiteError::ImageDecode { .. }));

    let err = compress_image(&noisy_png(8, 8), TargetSize::Megabytes(0.0), &CompressionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SuiteError::InvalidTarget { .. }));
}
