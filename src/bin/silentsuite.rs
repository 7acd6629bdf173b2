//! CLI binary for silentsuite.
//!
//! A thin shim over the library: each subcommand reads its inputs, calls
//! one library function and writes the results next to the inputs (or where
//! `--output` says).

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use silentsuite::offline::{CachePartition, CacheStorage};
use silentsuite::{
    compress_image, convert_image, convert_units, generate_meme, generate_password, generate_qr, images_to_pdf,
    rasterize_pdf, split_pdf, AssetManifest, CacheRequest, CompressionConfig, DiskCacheStorage,
    ImageFormatTarget, MergeQueue, NamedFile, OfflineCache, OfflineConfig, ProgressCallback,
    RasterOptions, RequestMode, TargetSize, TaskProgressCallback, UnitCategory,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: one bar per task, one log line per step.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Noun printed after the counter ("probes", "pages", "assets").
    unit: &'static str,
}

impl CliProgressCallback {
    fn new(unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, unit })
    }
}

impl TaskProgressCallback for CliProgressCallback {
    fn on_task_start(&self, task: &str, total_steps: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  ⏱ {{elapsed_precise}}",
            self.unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_steps as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(task.to_string());
    }

    fn on_step_start(&self, step: usize, _total: usize) {
        self.bar.set_message(format!("{} {step}", self.unit));
    }

    fn on_step_complete(&self, step: usize, total: usize, output_bytes: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            step,
            total,
            dim(&format!("{output_bytes:>9} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_task_complete(&self, task: &str, completed_steps: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} finished after {} {}",
            green("✔"),
            bold(task),
            completed_steps,
            self.unit
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compress a photo to roughly 500 KB
  silentsuite compress photo.png --target 500KB

  # PDF tools
  silentsuite merge a.pdf b.pdf c.pdf -o all.pdf
  silentsuite split report.pdf --pages "1-3, 5"
  silentsuite img2pdf scan1.jpg scan2.png
  silentsuite pdf2img slides.pdf --out-dir pages/

  # Small utilities
  silentsuite convert logo.png --to jpeg
  silentsuite meme cat.jpg --top "one does not" --bottom "simply" --font Impact.ttf
  silentsuite qr "https://example.com" -o link.png
  silentsuite password --length 24
  silentsuite units 5 ft m --category length

  # Offline cache
  silentsuite cache install --scope https://tools.example/ --generation v2
  silentsuite cache fetch ./index.html --navigate
  silentsuite cache list

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (else ./ then the system library)
  SILENTSUITE_CACHE_DIR   Offline cache directory
  SILENTSUITE_SCOPE       Offline cache scope URL
  SILENTSUITE_FONT        Caption font for `meme`
  RUST_LOG                Overrides -v / -q log filtering
"#;

/// Local file tools and an offline asset cache.
#[derive(Parser, Debug)]
#[command(
    name = "silentsuite",
    version,
    about = "Local file tools: PDF, image compression, QR, passwords, units, offline cache",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SILENTSUITE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SILENTSUITE_QUIET")]
    quiet: bool,

    /// Disable progress bars.
    #[arg(long, global = true, env = "SILENTSUITE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-encode an image as JPEG close to a target size.
    Compress {
        input: PathBuf,
        /// Target size, e.g. 500KB, 1.5MB or 2 (megabytes).
        #[arg(short, long)]
        target: TargetSize,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Maximum number of quality probes.
        #[arg(long, default_value_t = 8)]
        max_iterations: u32,
        /// Cap the longest edge before encoding (0 disables).
        #[arg(long, default_value_t = 1920)]
        max_dimension: u32,
    },
    /// Convert an image to JPEG or PNG.
    Convert {
        input: PathBuf,
        #[arg(long, value_enum)]
        to: FormatArg,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add top and bottom captions to an image.
    Meme {
        input: PathBuf,
        #[arg(long, default_value = "")]
        top: String,
        #[arg(long, default_value = "")]
        bottom: String,
        /// TrueType/OpenType font for the captions.
        #[arg(long, env = "SILENTSUITE_FONT")]
        font: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge two or more PDFs in the given order.
    Merge {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract a page range into a new PDF.
    Split {
        input: PathBuf,
        /// Pages to keep, e.g. "1-3, 5, 8-10".
        #[arg(short, long)]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Place JPEG/PNG images on one page each.
    Img2pdf {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render every PDF page to JPEG.
    Pdf2img {
        input: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 1.5)]
        scale: f32,
        #[arg(long, default_value_t = 0.85)]
        quality: f32,
    },
    /// Render text as a QR code PNG.
    Qr {
        text: String,
        #[arg(short, long, default_value = "qrcode.png")]
        output: PathBuf,
        /// Print the data: URI instead of writing a file.
        #[arg(long)]
        data_uri: bool,
    },
    /// Generate a random password.
    Password {
        #[arg(short, long, default_value_t = silentsuite::tools::DEFAULT_PASSWORD_LENGTH)]
        length: usize,
    },
    /// Convert a length, weight or temperature.
    Units {
        #[arg(allow_negative_numbers = true)]
        value: f64,
        from: String,
        to: String,
        /// length, weight or temp.
        #[arg(short, long)]
        category: UnitCategory,
    },
    /// Manage the offline asset cache.
    Cache(CacheArgs),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

impl From<FormatArg> for ImageFormatTarget {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpeg => ImageFormatTarget::Jpeg,
            FormatArg::Png => ImageFormatTarget::Png,
        }
    }
}

#[derive(Args, Debug)]
struct CacheArgs {
    /// Cache directory. Default: the platform cache dir + /silentsuite.
    #[arg(long, global = true, env = "SILENTSUITE_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Scope URL relative manifest entries resolve against.
    #[arg(long, global = true, env = "SILENTSUITE_SCOPE", default_value = silentsuite::config::DEFAULT_SCOPE)]
    scope: String,

    /// Generation tag. Default: the crate version.
    #[arg(long, global = true, env = "SILENTSUITE_GENERATION")]
    generation: Option<String>,

    /// HTTP timeout in seconds. Default: none.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    action: CacheAction,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Fetch the manifest into a new generation and activate it.
    Install {
        /// JSON manifest (`{"assets": [...]}`). Default: built-in list.
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Install only; leave the previous generation serving.
        #[arg(long)]
        no_activate: bool,
    },
    /// Resolve one request through the cache policies.
    Fetch {
        url: String,
        /// Treat as a document navigation (network-first).
        #[arg(long)]
        navigate: bool,
        /// Write the body here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List partitions and their entries.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = |unit: &'static str| -> Option<ProgressCallback> {
        show_progress.then(|| CliProgressCallback::new(unit) as ProgressCallback)
    };

    match cli.command {
        Command::Compress {
            input,
            target,
            output,
            max_iterations,
            max_dimension,
        } => {
            let bytes = read_input(&input).await?;
            let mut builder = CompressionConfig::builder()
                .max_iterations(max_iterations)
                .max_dimension((max_dimension > 0).then_some(max_dimension));
            if let Some(cb) = progress("probes") {
                builder = builder.progress_callback(cb);
            }
            let config = builder.build().context("Invalid compression settings")?;

            let outcome = compress_image(&bytes, target, &config)
                .await
                .context("Compression failed")?;
            let out = output.unwrap_or_else(|| sibling(&input, &compressed_name(&input)));
            write_file(&out, &outcome.image.bytes).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} → {} bytes  q={:.2}  {} probes{}  →  {}",
                    green("✔"),
                    bytes.len(),
                    outcome.image.size(),
                    outcome.image.quality,
                    outcome.probes,
                    if outcome.accepted { "" } else { " (closest)" },
                    bold(&out.display().to_string()),
                );
            }
        }

        Command::Convert { input, to, output } => {
            let bytes = read_input(&input).await?;
            let converted = convert_image(bytes, to.into())
                .await
                .context("Image conversion failed")?;
            let out = output.unwrap_or_else(|| sibling(&input, &converted.file_name));
            write_file(&out, &converted.bytes).await?;
            report(cli.quiet, &out);
        }

        Command::Meme {
            input,
            top,
            bottom,
            font,
            output,
        } => {
            let bytes = read_input(&input).await?;
            let font = read_input(&font).await?;
            let meme = generate_meme(bytes, font, &top, &bottom)
                .await
                .context("Meme generation failed")?;
            let out = output.unwrap_or_else(|| sibling(&input, &meme.file_name));
            write_file(&out, &meme.png).await?;
            report(cli.quiet, &out);
        }

        Command::Merge { inputs, output } => {
            let mut queue = MergeQueue::new();
            for path in &inputs {
                queue.push(read_named(path).await?);
            }
            let merged = queue.merge().await.context("Merge failed")?;
            let out = output.unwrap_or_else(|| PathBuf::from(&merged.name));
            merged.write_to(&out).await?;
            report(cli.quiet, &out);
        }

        Command::Split {
            input,
            pages,
            output,
        } => {
            let file = read_named(&input).await?;
            let split = split_pdf(file, &pages).await.context("Split failed")?;
            let out = output.unwrap_or_else(|| sibling(&input, &split.file.name));
            split.file.write_to(&out).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  kept {}/{} pages  →  {}",
                    green("✔"),
                    split.pages.len(),
                    split.source_pages,
                    bold(&out.display().to_string())
                );
            }
        }

        Command::Img2pdf { inputs, output } => {
            let mut images = Vec::with_capacity(inputs.len());
            for path in &inputs {
                images.push(read_named(path).await?);
            }
            let pdf = images_to_pdf(images).await.context("Image-to-PDF failed")?;
            let out = output.unwrap_or_else(|| PathBuf::from(&pdf.name));
            pdf.write_to(&out).await?;
            report(cli.quiet, &out);
        }

        Command::Pdf2img {
            input,
            out_dir,
            scale,
            quality,
        } => {
            let file = read_named(&input).await?;
            let options = RasterOptions {
                scale,
                quality,
                progress_callback: progress("pages"),
            };
            let pages = rasterize_pdf(file, &options)
                .await
                .context("Rasterisation failed")?;
            for page in &pages {
                write_file(&out_dir.join(&page.file_name), &page.bytes).await?;
            }
            if !cli.quiet {
                eprintln!(
                    "{}  {} pages  →  {}",
                    green("✔"),
                    pages.len(),
                    bold(&out_dir.display().to_string())
                );
            }
        }

        Command::Qr {
            text,
            output,
            data_uri,
        } => {
            let qr = generate_qr(&text).context("QR generation failed")?;
            if data_uri {
                println!("{}", qr.data_uri);
            } else {
                write_file(&output, &qr.png).await?;
                report(cli.quiet, &output);
            }
        }

        Command::Password { length } => {
            println!("{}", generate_password(length));
        }

        Command::Units {
            value,
            from,
            to,
            category,
        } => {
            let result = convert_units(value, category, &from, &to)?;
            println!("{result} {}", to.to_ascii_lowercase());
        }

        Command::Cache(args) => run_cache(args, cli.quiet, progress("assets")).await?,
    }

    Ok(())
}

// ── Offline cache subcommands ────────────────────────────────────────────────

async fn run_cache(args: CacheArgs, quiet: bool, progress: Option<ProgressCallback>) -> Result<()> {
    let root = match args.cache_dir {
        Some(dir) => dir,
        None => dirs::cache_dir()
            .map(|d| d.join("silentsuite"))
            .context("No platform cache directory; pass --cache-dir")?,
    };
    let storage = Arc::new(DiskCacheStorage::new(&root));

    let mut builder = OfflineConfig::builder().scope(args.scope);
    if let Some(secs) = args.timeout {
        builder = builder.fetch_timeout_secs(secs);
    }
    if let Some(generation) = args.generation {
        builder = builder.generation(generation);
    }

    match args.action {
        CacheAction::Install {
            manifest,
            no_activate,
        } => {
            if let Some(path) = manifest {
                let manifest = AssetManifest::from_file(&path)
                    .await
                    .with_context(|| format!("Failed to load manifest {}", path.display()))?;
                builder = builder.manifest(manifest);
            }
            let config = builder
                .skip_waiting(!no_activate)
                .build()
                .context("Invalid offline cache settings")?;
            let mut cache = OfflineCache::with_http(config, storage)?;
            if let Some(cb) = progress {
                cache = cache.with_progress(cb);
            }

            let (installed, activated) = cache.start().await.context("Install failed")?;
            if !quiet {
                eprintln!(
                    "{}  {} assets ({} bytes) in {}",
                    green("✔"),
                    installed.cached_keys.len(),
                    installed.total_bytes,
                    bold(&installed.cache_name)
                );
                match activated {
                    Some(a) if a.evicted.is_empty() => eprintln!("   active"),
                    Some(a) => eprintln!("   active; evicted {}", a.evicted.join(", ")),
                    None => eprintln!("   {}", dim("installed, not activated")),
                }
            }
        }

        CacheAction::Fetch {
            url,
            navigate,
            output,
        } => {
            let config = builder.build().context("Invalid offline cache settings")?;
            let scope = config.scope.clone();
            let cache = OfflineCache::with_http(config, storage)?;
            if !cache.resume().await? && !quiet {
                eprintln!(
                    "{} generation {} is not installed; going to the network",
                    cyan("⚠"),
                    cache.cache_name()
                );
            }

            let request = if navigate {
                CacheRequest::parse(&url, &scope, RequestMode::Navigate)?
            } else {
                let parsed = CacheRequest::parse(&url, &scope, RequestMode::SameOrigin)?;
                CacheRequest::asset(parsed.url, &scope)
            };
            let outcome = cache.handle_fetch(&request).await.context("Fetch failed")?;
            if !quiet {
                eprintln!(
                    "{}  HTTP {}  {:?}  {} bytes  via {:?}",
                    green("✔"),
                    outcome.response.status,
                    outcome.response.response_type,
                    outcome.response.body.len(),
                    outcome.source
                );
            }
            match output {
                Some(path) => write_file(&path, &outcome.response.body).await?,
                None => io::stdout()
                    .lock()
                    .write_all(&outcome.response.body)
                    .context("Failed to write to stdout")?,
            }
        }

        CacheAction::List => {
            let names = storage.keys().await?;
            if names.is_empty() {
                eprintln!("{} is empty", root.display());
            }
            for name in names {
                let partition: Arc<dyn CachePartition> = storage.open(&name).await?;
                let keys = partition.keys().await?;
                println!("{} ({} entries)", bold(&name), keys.len());
                for key in keys {
                    println!("  {key}");
                }
            }
        }
    }
    Ok(())
}

// ── File helpers ─────────────────────────────────────────────────────────────

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_named(path: &Path) -> Result<NamedFile> {
    NamedFile::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        bail!("Refusing to write an empty file to {}", path.display());
    }
    NamedFile::new(path.display().to_string(), bytes.to_vec())
        .write_to(path)
        .await?;
    Ok(())
}

/// `name` placed in the same directory as `input`.
fn sibling(input: &Path, name: &str) -> PathBuf {
    input
        .parent()
        .map(|p| p.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// `compressed-{stem}.jpg`: the output is always JPEG.
fn compressed_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("compressed-{stem}.jpg")
}

fn report(quiet: bool, out: &Path) {
    if !quiet {
        eprintln!("{}  {}", green("✔"), bold(&out.display().to_string()));
    }
}
