//! Configuration types for blank-page cleaning.
//!
//! All cleaning behaviour is controlled through [`CleanerConfig`], built via
//! its [`CleanerConfigBuilder`]. One struct is cloned into every worker, so
//! every document in a batch sees the same thresholds.

use crate::error::CleanError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default minimum raster file size in bytes; smaller rasters are blank.
pub const DEFAULT_SIZE_THRESHOLD: u64 = 1000;

/// Default maximum mean grayscale brightness (0–255) for a non-blank page.
pub const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 250.0;

/// Configuration for a cleaning run.
///
/// Built via [`CleanerConfig::builder()`] or using
/// [`CleanerConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_blank_cleaner::CleanerConfig;
///
/// let config = CleanerConfig::builder()
///     .workers(4)
///     .size_threshold(2048)
///     .dpi(150)
///     .build()
///     .unwrap();
/// assert_eq!(config.workers, 4);
/// ```
#[derive(Clone)]
pub struct CleanerConfig {
    /// Number of documents processed concurrently. Default: available CPU parallelism.
    ///
    /// Each in-flight document holds one page raster at a time plus its
    /// parsed PDF, so peak memory grows with this value.
    pub workers: usize,

    /// Raster files smaller than this many bytes are classified blank. Default: 1000.
    ///
    /// An encoded PNG of an empty page compresses to almost nothing, so a
    /// tiny file is a cheap signal that the page carries no content.
    pub size_threshold: u64,

    /// Pages whose mean grayscale brightness exceeds this are blank. Range 0–255. Default: 250.
    pub brightness_threshold: f64,

    /// Rendering DPI used when rasterising each page. Range: 72–600. Default: 200.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// Image format of the temporary page rasters. Default: PNG.
    ///
    /// The size heuristic depends on the encoder, so thresholds tuned for
    /// PNG do not carry over to JPEG unchanged.
    pub raster_format: RasterFormat,

    /// Explicit pdfium shared-library path. If None, `PDFIUM_LIB_PATH`,
    /// the working directory and the system library are tried in turn.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            dpi: 200,
            max_rendered_pixels: 4000,
            raster_format: RasterFormat::default(),
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CleanerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanerConfig")
            .field("workers", &self.workers)
            .field("size_threshold", &self.size_threshold)
            .field("brightness_threshold", &self.brightness_threshold)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("raster_format", &self.raster_format)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CleanProgressCallback>"),
            )
            .finish()
    }
}

impl CleanerConfig {
    /// Create a new builder for `CleanerConfig`.
    pub fn builder() -> CleanerConfigBuilder {
        CleanerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The thresholds the classifier compares against.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            size_threshold: self.size_threshold,
            brightness_threshold: self.brightness_threshold,
        }
    }
}

/// One worker per available CPU, falling back to a single worker.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Builder for [`CleanerConfig`].
#[derive(Debug)]
pub struct CleanerConfigBuilder {
    config: CleanerConfig,
}

impl CleanerConfigBuilder {
    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn size_threshold(mut self, bytes: u64) -> Self {
        self.config.size_threshold = bytes;
        self
    }

    pub fn brightness_threshold(mut self, value: f64) -> Self {
        self.config.brightness_threshold = value;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn raster_format(mut self, format: RasterFormat) -> Self {
        self.config.raster_format = format;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CleanerConfig, CleanError> {
        let c = &self.config;
        if !(0.0..=255.0).contains(&c.brightness_threshold) {
            return Err(CleanError::InvalidConfig(format!(
                "Brightness threshold must be 0–255, got {}",
                c.brightness_threshold
            )));
        }
        if c.workers == 0 {
            return Err(CleanError::InvalidConfig("Workers must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Classifier thresholds, split out so the classify stage does not depend on
/// the whole config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum raster file size in bytes.
    pub size_threshold: u64,
    /// Maximum mean grayscale brightness.
    pub brightness_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
        }
    }
}

/// Encoding used for the temporary page rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterFormat {
    /// Lossless; the format the default size threshold is tuned for.
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            RasterFormat::Png => image::ImageFormat::Png,
            RasterFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classifier_constants() {
        let config = CleanerConfig::default();
        assert_eq!(config.size_threshold, 1000);
        assert_eq!(config.brightness_threshold, 250.0);
        assert!(config.workers >= 1);
        assert_eq!(config.thresholds(), Thresholds::default());
    }

    #[test]
    fn builder_clamps_values() {
        let config = CleanerConfig::builder()
            .workers(0)
            .dpi(10)
            .max_rendered_pixels(5)
            .build()
            .expect("valid config");
        assert_eq!(config.workers, 1);
        assert_eq!(config.dpi, 72);
        assert_eq!(config.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_unreachable_brightness() {
        let err = CleanerConfig::builder()
            .brightness_threshold(500.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, CleanError::InvalidConfig(_)));
    }

    #[test]
    fn raster_format_extensions() {
        assert_eq!(RasterFormat::Png.extension(), "png");
        assert_eq!(RasterFormat::Jpeg.extension(), "jpg");
        assert_eq!(RasterFormat::default(), RasterFormat::Png);
    }

    #[test]
    fn debug_hides_callback() {
        let config = CleanerConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("<dyn CleanProgressCallback>"));
    }
}
