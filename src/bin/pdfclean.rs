//! CLI binary for pdf-blank-cleaner.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CleanerConfig` and prints the per-document summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pdf_blank_cleaner::{
    clean_folder, BatchReport, CleanProgressCallback, CleanerConfig, DocumentReport, PageOutcome,
    ProgressCallback, RasterFormat,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One overall bar for documents plus one bar per document in flight.
/// Documents finish in any order; each bar is removed when its document ends.
struct CliProgressCallback {
    multi: MultiProgress,
    overall: ProgressBar,
    /// In-flight documents: their bar and blank pages found so far.
    documents: Mutex<HashMap<String, (ProgressBar, usize)>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(0));
        overall.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} documents  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        overall.set_prefix("Cleaning");
        overall.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            multi,
            overall,
            documents: Mutex::new(HashMap::new()),
        })
    }

    fn document_bar(&self, total_pages: usize, name: &str) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(total_pages as u64));
        bar.set_style(
            ProgressStyle::with_template("  {prefix:<32!} [{bar:30.cyan/238}] {pos:>4}/{len} pages  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix(name.to_string());
        bar
    }

    fn finish_document(&self, name: &str) {
        if let Some((bar, _)) = self.documents.lock().unwrap().remove(name) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
        self.overall.inc(1);
    }
}

impl CleanProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.overall.set_length(total_documents as u64);
    }

    fn on_document_start(&self, name: &str, total_pages: usize) {
        let bar = self.document_bar(total_pages, name);
        self.documents
            .lock()
            .unwrap()
            .insert(name.to_string(), (bar, 0));
    }

    fn on_page_complete(&self, name: &str, _page: usize, _total: usize, outcome: &PageOutcome) {
        if let Some((bar, blank)) = self.documents.lock().unwrap().get_mut(name) {
            if let PageOutcome::Blank(_) = outcome {
                *blank += 1;
                bar.set_message(format!("{} blank", blank));
            }
            bar.inc(1);
        }
    }

    fn on_document_complete(&self, report: &DocumentReport) {
        self.overall.println(format!(
            "  {} {:<32}  {}",
            green("✓"),
            report.name,
            dim(&format!(
                "{}/{} pages kept  {:.1}s",
                report.retained_pages,
                report.total_pages,
                report.duration_ms as f64 / 1000.0
            )),
        ));
        self.finish_document(&report.name);
    }

    fn on_document_error(&self, name: &str, error: &str) {
        // Keep the log line to one terminal row.
        let first_line = error.lines().next().unwrap_or(error);
        self.overall
            .println(format!("  {} {:<32}  {}", red("✗"), name, red(first_line)));
        self.finish_document(name);
    }

    fn on_batch_complete(&self, _report: &BatchReport) {
        self.overall.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean ./input into ./output
  pdfclean

  # Explicit folders
  pdfclean scans/ cleaned/

  # Two workers, stricter size check
  pdfclean --workers 2 --size-threshold 4000 scans/ cleaned/

  # Machine-readable report
  pdfclean --json scans/ cleaned/ > report.json

HOW PAGES ARE CLASSIFIED:
  Each page is rendered to a temporary image and checked in order:
    1. no non-white pixel at all            → blank
    2. image file smaller than --size-threshold bytes → blank
    3. mean brightness above --brightness-threshold   → blank
  Pages that fail to render are left out without being counted as blank.
  Pages whose image cannot be analysed are kept.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise ./ and system paths)
  RUST_LOG                Override the log filter (e.g. pdf_blank_cleaner=debug)
"#;

/// Remove blank pages from every PDF in a folder.
#[derive(Parser, Debug)]
#[command(
    name = "pdfclean",
    version,
    about = "Remove blank pages from every PDF in a folder",
    long_about = "Renders each page of every PDF in INPUT_DIR, detects blank pages from the \
rendered image, and writes a copy of each document without them to OUTPUT_DIR under the \
same file name.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the PDFs to clean.
    #[arg(default_value = "input")]
    input_dir: PathBuf,

    /// Folder receiving the cleaned PDFs (created if missing).
    #[arg(default_value = "output")]
    output_dir: PathBuf,

    /// Documents processed in parallel. Default: number of CPUs.
    #[arg(short, long, env = "PDFCLEAN_WORKERS")]
    workers: Option<usize>,

    /// Page images smaller than this many bytes are blank.
    #[arg(long, env = "PDFCLEAN_SIZE_THRESHOLD", default_value_t = 1000)]
    size_threshold: u64,

    /// Pages brighter than this on average (0–255) are blank.
    #[arg(long, env = "PDFCLEAN_BRIGHTNESS_THRESHOLD", default_value_t = 250.0)]
    brightness_threshold: f64,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDFCLEAN_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Cap on the rendered width and height in pixels.
    #[arg(long, env = "PDFCLEAN_MAX_PIXELS", default_value_t = 4000)]
    max_pixels: u32,

    /// Format of the temporary page images.
    #[arg(long, env = "PDFCLEAN_RASTER_FORMAT", value_enum, default_value = "png")]
    raster_format: RasterFormatArg,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFCLEAN_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Print the batch report as JSON instead of summary lines.
    #[arg(long)]
    json: bool,

    /// Disable progress bars.
    #[arg(long, env = "PDFCLEAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCLEAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the summary.
    #[arg(short, long, env = "PDFCLEAN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RasterFormatArg {
    Png,
    Jpeg,
}

impl From<RasterFormatArg> for RasterFormat {
    fn from(v: RasterFormatArg) -> Self {
        match v {
            RasterFormatArg::Png => RasterFormat::Png,
            RasterFormatArg::Jpeg => RasterFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear through the progress bars; keep them
    // quiet while the bars are drawn.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn CleanProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = clean_folder(&cli.input_dir, &cli.output_dir, &config)
        .await
        .with_context(|| format!("Failed to clean '{}'", cli.input_dir.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else {
        for doc in &report.documents {
            match &doc.outcome {
                Ok(r) => println!("Processed {}: Removed {} blank pages", r.name, r.blank_pages),
                Err(e) => println!("Failed {}: {}", doc.name, e.lines().next().unwrap_or(e)),
            }
        }

        if !cli.quiet && !report.documents.is_empty() {
            eprintln!(
                "{}  {} document(s), {} blank page(s) removed, {}ms  →  {}",
                if report.has_failures() {
                    red("✘")
                } else {
                    green("✔")
                },
                report.documents.len(),
                bold(&report.total_blank_pages.to_string()),
                report.duration_ms,
                bold(&cli.output_dir.display().to_string()),
            );
        }
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `CleanerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CleanerConfig> {
    let mut builder = CleanerConfig::builder()
        .size_threshold(cli.size_threshold)
        .brightness_threshold(cli.brightness_threshold)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .raster_format(cli.raster_format.clone().into());

    if let Some(workers) = cli.workers {
        builder = builder.workers(workers);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_blank_cleaner::BlankReason;

    #[test]
    fn progress_counts_blank_pages_per_document() {
        let cb = CliProgressCallback::new();
        cb.on_batch_start(2);
        cb.on_document_start("a.pdf", 3);
        cb.on_document_start("b.pdf", 1);

        let blank = PageOutcome::Blank(BlankReason::NoContent);
        cb.on_page_complete("a.pdf", 1, 3, &blank);
        cb.on_page_complete("b.pdf", 1, 1, &PageOutcome::Retained);
        cb.on_page_complete("a.pdf", 2, 3, &PageOutcome::Retained);
        cb.on_page_complete("a.pdf", 3, 3, &blank);

        let documents = cb.documents.lock().unwrap();
        let (bar, count) = &documents["a.pdf"];
        assert_eq!(*count, 2);
        assert_eq!(bar.position(), 3);
        assert_eq!(bar.message(), "2 blank");
        assert_eq!(documents["b.pdf"].1, 0);
    }

    #[test]
    fn finished_document_leaves_the_map() {
        let cb = CliProgressCallback::new();
        cb.on_document_start("a.pdf", 1);
        cb.on_document_error("a.pdf", "corrupt\nmore detail");
        assert!(cb.documents.lock().unwrap().is_empty());
        assert_eq!(cb.overall.position(), 1);
    }

    #[test]
    fn defaults_map_to_config() {
        let cli = Cli::try_parse_from(["pdfclean"]).unwrap();
        assert_eq!(cli.input_dir, PathBuf::from("input"));
        assert_eq!(cli.output_dir, PathBuf::from("output"));

        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.size_threshold, 1000);
        assert_eq!(config.brightness_threshold, 250.0);
        assert_eq!(config.dpi, 200);
        assert_eq!(config.raster_format, RasterFormat::Png);
    }

    #[test]
    fn out_of_range_brightness_is_rejected() {
        let cli =
            Cli::try_parse_from(["pdfclean", "--brightness-threshold", "500", "in", "out"]).unwrap();
        assert!(build_config(&cli, None).is_err());
    }
}
