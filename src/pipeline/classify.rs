//! Blank-page classification of a rendered page raster.
//!
//! Three checks run in order and the first match wins:
//!
//! 1. no pixel darker than pure white → blank ([`BlankReason::NoContent`])
//! 2. encoded file smaller than the size threshold → blank
//!    ([`BlankReason::BelowSizeThreshold`])
//! 3. mean grayscale brightness above the brightness threshold → blank
//!    ([`BlankReason::NearWhite`])
//!
//! Anything else is [`PageVerdict::NotBlank`]. Errors are returned, not
//! swallowed; the document processor decides what an error means.

use crate::config::Thresholds;
use crate::error::PageError;
use crate::output::{BlankReason, PageVerdict};
use image::GrayImage;
use std::path::Path;
use tracing::debug;

/// Grayscale value treated as page background.
const BACKGROUND: u8 = 255;

/// Bounding box of non-background pixels. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Classify the raster at `image_path`. `page_number` is only used to label
/// errors.
pub fn classify_page(
    image_path: &Path,
    page_number: usize,
    thresholds: &Thresholds,
) -> Result<PageVerdict, PageError> {
    let failed = |detail: String| PageError::ClassifyFailed {
        page: page_number,
        detail,
    };

    let gray = image::open(image_path)
        .map_err(|e| failed(format!("{}: {}", image_path.display(), e)))?
        .to_luma8();

    let Some(bbox) = bounding_box(&gray) else {
        return Ok(PageVerdict::Blank(BlankReason::NoContent));
    };

    let file_size = std::fs::metadata(image_path)
        .map_err(|e| failed(format!("{}: {}", image_path.display(), e)))?
        .len();
    if file_size < thresholds.size_threshold {
        debug!(
            "Page {}: raster is {} bytes (< {})",
            page_number, file_size, thresholds.size_threshold
        );
        return Ok(PageVerdict::Blank(BlankReason::BelowSizeThreshold));
    }

    let brightness = mean_brightness(&gray);
    if brightness > thresholds.brightness_threshold {
        debug!(
            "Page {}: mean brightness {:.2} (> {})",
            page_number, brightness, thresholds.brightness_threshold
        );
        return Ok(PageVerdict::Blank(BlankReason::NearWhite));
    }

    debug!(
        "Page {}: content {}x{} at ({}, {}), {} bytes, brightness {:.2}",
        page_number,
        bbox.width(),
        bbox.height(),
        bbox.left,
        bbox.top,
        file_size,
        brightness
    );
    Ok(PageVerdict::NotBlank)
}

/// Smallest rectangle enclosing every non-white pixel, or `None` when the
/// image is entirely white (or empty).
pub fn bounding_box(image: &GrayImage) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[0] == BACKGROUND {
            continue;
        }
        match bbox.as_mut() {
            None => {
                bbox = Some(BoundingBox {
                    left: x,
                    top: y,
                    right: x + 1,
                    bottom: y + 1,
                })
            }
            Some(b) => {
                b.left = b.left.min(x);
                b.right = b.right.max(x + 1);
                b.bottom = b.bottom.max(y + 1);
            }
        }
    }

    bbox
}

/// Mean grayscale value over the whole image (0.0 for an empty image).
pub fn mean_brightness(image: &GrayImage) -> f64 {
    let count = image.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.as_raw().iter().map(|&v| v as u64).sum();
    sum as f64 / count as f64
}
