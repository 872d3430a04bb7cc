//! Result types produced by the cleaning pipeline.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why a page was classified blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlankReason {
    /// Every pixel is white; there is no content bounding box.
    NoContent,
    /// The encoded raster is smaller than the size threshold.
    BelowSizeThreshold,
    /// Mean brightness exceeds the brightness threshold.
    NearWhite,
}

/// Classifier decision for one page raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageVerdict {
    Blank(BlankReason),
    NotBlank,
}

/// What happened to one page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageOutcome {
    /// Classified not blank; copied to the output.
    Retained,
    /// Classified blank; removed and counted.
    Blank(BlankReason),
    /// No raster was produced; removed without being counted blank.
    Dropped(PageError),
    /// The classifier failed; the page was kept.
    KeptOnError(PageError),
}

impl PageOutcome {
    /// Whether the page ends up in the output document.
    pub fn is_retained(&self) -> bool {
        matches!(self, PageOutcome::Retained | PageOutcome::KeptOnError(_))
    }
}

/// Statistics for one successfully cleaned document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// File name of the input document.
    pub name: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Pages in the input document.
    pub total_pages: usize,
    /// Pages written to the output document.
    pub retained_pages: usize,
    /// Pages classified blank and removed.
    pub blank_pages: usize,
    /// Pages removed because rasterisation produced no image.
    pub dropped_pages: usize,
    /// Pages kept because the classifier failed on them.
    pub classify_errors: usize,
    pub duration_ms: u64,
}

/// Per-document entry in a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub name: String,
    pub input_path: PathBuf,
    /// The report on success, the rendered error message on failure.
    pub outcome: Result<DocumentReport, String>,
}

impl DocumentResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Blank pages removed, or `None` if the document failed.
    pub fn blank_pages(&self) -> Option<usize> {
        self.outcome.as_ref().ok().map(|r| r.blank_pages)
    }
}

/// Merged outcome of a folder run.
///
/// `documents` is in completion order, which varies between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub total_blank_pages: usize,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Fold one worker's result into the report.
    pub fn push(&mut self, result: DocumentResult) {
        match &result.outcome {
            Ok(report) => {
                self.succeeded += 1;
                self.total_blank_pages += report.blank_pages;
            }
            Err(_) => self.failed += 1,
        }
        self.documents.push(result);
    }

    /// Look up a document by file name.
    pub fn get(&self, name: &str) -> Option<&DocumentResult> {
        self.documents.iter().find(|d| d.name == name)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
