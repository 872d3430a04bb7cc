//! Folder-level entry points: fan documents out over a worker pool.
//!
//! Every document is handled end-to-end by one blocking worker
//! (`spawn_blocking`), with at most `config.workers` documents in flight.
//! Each worker hands its result back as a return value; the results are
//! merged into one [`BatchReport`] once the pool drains, so no collection
//! is shared between workers.
//!
//! A failing document (corrupt file, unwritable output, even a panic inside
//! the worker) is recorded as a failed [`DocumentResult`] and does not
//! affect its siblings.

use crate::config::CleanerConfig;
use crate::error::CleanError;
use crate::output::{BatchReport, DocumentReport, DocumentResult};
use crate::pipeline::discover::{self, DocumentJob};
use crate::pipeline::document::process_document;
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Remove blank pages from every PDF in `input_dir`, writing the cleaned
/// copies to `output_dir` (created if missing) under the same file names.
///
/// Pages are rendered with pdfium.
///
/// # Returns
/// `Ok(BatchReport)` once every document has been attempted, even if some
/// failed (check `report.failed`).
///
/// # Errors
/// Returns `Err(CleanError)` only for batch-level problems:
/// - the input folder is missing or unreadable
/// - the output folder cannot be created
/// - pdfium cannot be loaded (and there is at least one document)
pub async fn clean_folder(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &CleanerConfig,
) -> Result<BatchReport, CleanError> {
    let rasterizer: Arc<dyn PageRasterizer> = Arc::new(PdfiumRasterizer::new(config));
    clean_folder_with(input_dir, output_dir, config, rasterizer).await
}

/// Like [`clean_folder`], with a caller-supplied rasteriser.
pub async fn clean_folder_with(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &CleanerConfig,
    rasterizer: Arc<dyn PageRasterizer>,
) -> Result<BatchReport, CleanError> {
    let start = Instant::now();
    let input_dir = input_dir.as_ref();
    let output_dir = output_dir.as_ref();
    info!(
        "Cleaning {} → {} with {} worker(s)",
        input_dir.display(),
        output_dir.display(),
        config.workers
    );

    // ── Step 1: Output folder ────────────────────────────────────────────
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| CleanError::CreateDirFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    // ── Step 2: Discover documents ───────────────────────────────────────
    let jobs = discover::plan_jobs(input_dir, output_dir)?;
    info!("Found {} PDF document(s)", jobs.len());

    if !jobs.is_empty() {
        let r = Arc::clone(&rasterizer);
        tokio::task::spawn_blocking(move || r.check_ready())
            .await
            .map_err(|e| CleanError::Internal(format!("Readiness check panicked: {}", e)))??;
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(jobs.len());
    }

    // ── Step 3: Fan out over the worker pool ─────────────────────────────
    let results: Vec<DocumentResult> = stream::iter(jobs.into_iter().map(|job| {
        let rasterizer = Arc::clone(&rasterizer);
        let config = config.clone();
        async move { run_job(job, rasterizer, config).await }
    }))
    .buffer_unordered(config.workers.max(1))
    .collect()
    .await;

    // ── Step 4: Merge ────────────────────────────────────────────────────
    let mut report = BatchReport::default();
    for result in results {
        report.push(result);
    }
    report.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Batch complete: {} succeeded, {} failed, {} blank pages removed in {}ms",
        report.succeeded, report.failed, report.total_blank_pages, report.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(&report);
    }

    Ok(report)
}

/// Blocking wrapper around [`clean_folder`].
///
/// Creates a temporary tokio runtime internally.
pub fn clean_folder_sync(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &CleanerConfig,
) -> Result<BatchReport, CleanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CleanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(clean_folder(input_dir, output_dir, config))
}

/// Clean a single PDF with pdfium rendering.
///
/// Creates the output file's parent folder if needed.
pub async fn clean_document(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &CleanerConfig,
) -> Result<DocumentReport, CleanError> {
    let rasterizer: Arc<dyn PageRasterizer> = Arc::new(PdfiumRasterizer::new(config));
    clean_document_with(input, output, config, rasterizer).await
}

/// Like [`clean_document`], with a caller-supplied rasteriser.
pub async fn clean_document_with(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &CleanerConfig,
    rasterizer: Arc<dyn PageRasterizer>,
) -> Result<DocumentReport, CleanError> {
    let input = input.as_ref().to_path_buf();
    let output = output.as_ref().to_path_buf();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CleanError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        rasterizer.check_ready()?;
        process_document(&input, &output, rasterizer.as_ref(), &config)
    })
    .await
    .map_err(|e| CleanError::Internal(format!("Document task panicked: {}", e)))?
}

/// Run one job on a blocking thread and convert every failure mode into a
/// [`DocumentResult`].
async fn run_job(
    job: DocumentJob,
    rasterizer: Arc<dyn PageRasterizer>,
    config: CleanerConfig,
) -> DocumentResult {
    let name = job.name.clone();
    let input_path = job.input.clone();
    let callback = config.progress_callback.clone();

    let joined = tokio::task::spawn_blocking(move || {
        process_document(&job.input, &job.output, rasterizer.as_ref(), &config)
    })
    .await;

    let outcome = match joined {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(CleanError::Internal(format!("Worker for '{}' panicked: {}", name, e))
            .to_string()),
    };

    match (&outcome, callback) {
        (Ok(report), Some(cb)) => cb.on_document_complete(report),
        (Err(message), cb) => {
            warn!("Failed to clean {}: {}", name, message);
            if let Some(cb) = cb {
                cb.on_document_error(&name, message);
            }
        }
        (Ok(_), None) => {}
    }

    DocumentResult {
        name,
        input_path,
        outcome,
    }
}
