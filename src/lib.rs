//! # pdf-blank-cleaner
//!
//! Batch-remove blank pages from PDF documents.
//!
//! Scanned documents are full of empty backs of pages and separator sheets.
//! This crate renders every page, decides from the raster whether it is
//! blank, and writes a copy of each document that contains only the pages
//! that carry content. Retained pages are copied as-is; nothing is
//! re-encoded.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input/ folder
//!  │
//!  ├─ 1. Discover  *.pdf in the folder (case-insensitive, top level only)
//!  ├─ 2. Fan out   one worker per document, pool sized to the CPU count
//!  ├─ 3. Render    page → temporary PNG via pdfium
//!  ├─ 4. Classify  bounding box → file size → mean brightness
//!  ├─ 5. Write     surviving pages → output/<same name>.pdf
//!  └─ 6. Report    blank pages removed per document
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_blank_cleaner::{clean_folder, CleanerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CleanerConfig::default();
//!     let report = clean_folder("input", "output", &config).await?;
//!     for doc in &report.documents {
//!         if let Some(n) = doc.blank_pages() {
//!             println!("Processed {}: Removed {} blank pages", doc.name, n);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfclean` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Rendering needs the pdfium shared library at runtime; see
//! [`pipeline::render::PdfiumRasterizer`] for where it is looked up.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    clean_document, clean_document_with, clean_folder, clean_folder_sync, clean_folder_with,
};
pub use config::{CleanerConfig, CleanerConfigBuilder, RasterFormat, Thresholds};
pub use error::{CleanError, PageError};
pub use output::{BatchReport, BlankReason, DocumentReport, DocumentResult, PageOutcome, PageVerdict};
pub use pipeline::classify::classify_page;
pub use pipeline::document::process_document;
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{CleanProgressCallback, NoopProgressCallback, ProgressCallback};
