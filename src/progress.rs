//! Progress-callback trait for batch, document and page events.
//!
//! Inject an [`Arc<dyn CleanProgressCallback>`] via
//! [`crate::config::CleanerConfigBuilder::progress_callback`] to receive
//! events as the workers process documents.
//!
//! # Example
//!
//! ```rust
//! use pdf_blank_cleaner::{CleanProgressCallback, CleanerConfig, PageOutcome};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BlankCounter {
//!     blanks: AtomicUsize,
//! }
//!
//! impl CleanProgressCallback for BlankCounter {
//!     fn on_page_complete(&self, _doc: &str, _page: usize, _total: usize, outcome: &PageOutcome) {
//!         if matches!(outcome, PageOutcome::Blank(_)) {
//!             self.blanks.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(BlankCounter { blanks: AtomicUsize::new(0) });
//!
//! let config = CleanerConfig::builder()
//!     .progress_callback(counter as Arc<dyn CleanProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BatchReport, DocumentReport, PageOutcome};
use std::sync::Arc;

/// Called by the cleaning pipeline as it processes documents.
///
/// Implementations must be `Send + Sync`: every worker thread calls into the
/// same instance, so events from different documents interleave. Page events
/// for any single document arrive in page order. All methods default to
/// no-ops.
pub trait CleanProgressCallback: Send + Sync {
    /// Called once after discovery, before any document is dispatched.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a worker has opened a document and knows its page count.
    fn on_document_start(&self, name: &str, total_pages: usize) {
        let _ = (name, total_pages);
    }

    /// Called after each page has been rendered and classified.
    ///
    /// # Arguments
    /// * `page_number` — 1-indexed page number
    /// * `outcome`     — what happened to the page
    fn on_page_complete(
        &self,
        name: &str,
        page_number: usize,
        total_pages: usize,
        outcome: &PageOutcome,
    ) {
        let _ = (name, page_number, total_pages, outcome);
    }

    /// Called after the cleaned document has been written.
    fn on_document_complete(&self, report: &DocumentReport) {
        let _ = report;
    }

    /// Called when a document could not be processed.
    fn on_document_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once after every worker has finished.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CleanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CleanerConfig`].
pub type ProgressCallback = Arc<dyn CleanProgressCallback>;
