//! Error types for the pdf-blank-cleaner library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CleanError`] — **Fatal**: a document (or the whole batch) cannot be
//!   processed at all (missing input folder, corrupt PDF, unwritable output).
//!   Inside a batch a document-level `CleanError` is recorded against that
//!   document only; the other documents carry on.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be rendered or
//!   classified. The document processor absorbs it and applies a fixed policy
//!   (render failure drops the page, classification failure keeps it).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-blank-cleaner library.
///
/// Page-level failures use [`PageError`] and are recorded in
/// [`crate::output::PageOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum CleanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Input folder does not exist.
    #[error("Input folder not found: '{path}'")]
    InputDirNotFound { path: PathBuf },

    /// Input path exists but is a file, not a folder.
    #[error("Input path is not a folder: '{path}'")]
    NotADirectory { path: PathBuf },

    /// Listing the input folder failed.
    #[error("Failed to list folder '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output folder.
    #[error("Failed to create output folder '{path}': {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the cleaned PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the scratch folder for page rasters.
    #[error("Failed to create temporary raster folder: {0}")]
    TempDirFailed(#[source] std::io::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Page rendering needs the pdfium shared library. You can:\n\
  • Pass --pdfium-lib /path/to/libpdfium.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
  • Place libpdfium next to the working directory or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a worker panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PageError {
    /// The rasteriser could not produce an image for the page.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The image was rendered but could not be written to disk.
    #[error("Page {page}: saving raster to '{path}' failed: {detail}")]
    SaveFailed {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// The raster exists but could not be read or measured.
    #[error("Page {page}: classification failed: {detail}")]
    ClassifyFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-based page number the error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::SaveFailed { page, .. }
            | PageError::ClassifyFailed { page, .. } => *page,
        }
    }
}
