//! Page rasterisation: render the pages of a PDF to image files via pdfium.
//!
//! The document processor never talks to pdfium directly. It goes through
//! the [`PageRasterizer`] trait, so the rendering engine can be swapped
//! (tests inject a rasteriser that needs no shared library).
//!
//! ## Locking
//!
//! pdfium keeps process-global state; binding initialises the library and
//! dropping the binding tears it down, so two workers holding bindings at
//! once would pull the library out from under each other. A worker therefore
//! holds [`RENDER_LOCK`] for the whole render pass of one document: bind
//! once, load once, render and save every page, release. Classification and
//! PDF writing happen after the lock is released and run in parallel across
//! workers.

use crate::config::{CleanerConfig, RasterFormat};
use crate::error::{CleanError, PageError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

static RENDER_LOCK: Mutex<()> = Mutex::new(());

/// Renders the pages of a PDF to images.
pub trait PageRasterizer: Send + Sync {
    /// Render page `page_number` (1-indexed) of the PDF at `pdf_path`.
    fn render_page(&self, pdf_path: &Path, page_number: usize) -> Result<DynamicImage, PageError>;

    /// Render pages `1..=page_count` in order, handing each result to `sink`.
    ///
    /// `Err` means the engine could not open the document at all; pages not
    /// handed to `sink` by then count as unrendered. The default calls
    /// [`render_page`](Self::render_page) once per page.
    fn render_pages(
        &self,
        pdf_path: &Path,
        page_count: usize,
        sink: &mut dyn FnMut(usize, Result<DynamicImage, PageError>),
    ) -> Result<(), CleanError> {
        for page_number in 1..=page_count {
            sink(page_number, self.render_page(pdf_path, page_number));
        }
        Ok(())
    }

    /// Fail fast before a batch starts if the engine cannot work at all.
    ///
    /// Without this check an unavailable engine would make every page fail
    /// to render, and every document would be written back with no pages.
    fn check_ready(&self) -> Result<(), CleanError> {
        Ok(())
    }
}

/// [`PageRasterizer`] backed by the pdfium shared library.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
    dpi: u32,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    pub fn new(config: &CleanerConfig) -> Self {
        Self {
            library_path: config.pdfium_library_path.clone(),
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
        }
    }

    /// Bind to pdfium, trying in order: the configured path,
    /// `PDFIUM_LIB_PATH`, the working directory, the system library.
    fn bind(&self) -> Result<Pdfium, CleanError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(&path).map_err(|e| {
                CleanError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
            })?,
            None => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| CleanError::PdfiumBindingFailed(e.to_string()))?,
        };

        Ok(Pdfium::new(bindings))
    }

    fn render_config(&self) -> PdfRenderConfig {
        PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32)
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_page(&self, pdf_path: &Path, page_number: usize) -> Result<DynamicImage, PageError> {
        let _guard = RENDER_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let pdfium = self.bind().map_err(|e| PageError::RenderFailed {
            page: page_number,
            detail: e.to_string(),
        })?;
        let document =
            pdfium
                .load_pdf_from_file(pdf_path, None)
                .map_err(|e| PageError::RenderFailed {
                    page: page_number,
                    detail: format!("{:?}", e),
                })?;

        render_loaded(document.pages(), page_number, &self.render_config())
    }

    fn render_pages(
        &self,
        pdf_path: &Path,
        page_count: usize,
        sink: &mut dyn FnMut(usize, Result<DynamicImage, PageError>),
    ) -> Result<(), CleanError> {
        let _guard = RENDER_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let pdfium = self.bind()?;
        let document =
            pdfium
                .load_pdf_from_file(pdf_path, None)
                .map_err(|e| CleanError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: format!("{:?}", e),
                })?;

        let render_config = self.render_config();
        for page_number in 1..=page_count {
            sink(
                page_number,
                render_loaded(document.pages(), page_number, &render_config),
            );
        }
        Ok(())
    }

    fn check_ready(&self) -> Result<(), CleanError> {
        let _guard = RENDER_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.bind().map(|_| ())
    }
}

/// Render one page of an already loaded document.
fn render_loaded(
    pages: &PdfPages<'_>,
    page_number: usize,
    render_config: &PdfRenderConfig,
) -> Result<DynamicImage, PageError> {
    let failed = |detail: String| PageError::RenderFailed {
        page: page_number,
        detail,
    };

    let total_pages = pages.len() as usize;
    if page_number == 0 || page_number > total_pages {
        return Err(failed(format!(
            "page out of range (document has {} pages)",
            total_pages
        )));
    }

    let page = pages
        .get((page_number - 1) as u16)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Path of the `index`-th raster written for `prefix`: `{prefix}-{index}.{ext}`.
pub fn raster_image_path(prefix: &Path, index: usize, format: RasterFormat) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(format!("-{}.{}", index, format.extension()));
    PathBuf::from(name)
}

/// Render every page of `pdf_path` into `scratch_dir`, one raster per page
/// named `page_{n}-1.{ext}`.
///
/// Returns one entry per page, in page order. An `Err` entry means no raster
/// file exists for that page; failures are logged here.
pub fn rasterize_document(
    rasterizer: &dyn PageRasterizer,
    pdf_path: &Path,
    page_count: usize,
    scratch_dir: &Path,
    format: RasterFormat,
) -> Vec<Result<PathBuf, PageError>> {
    let mut rasters: Vec<Option<Result<PathBuf, PageError>>> =
        (0..page_count).map(|_| None).collect();

    let rendered = rasterizer.render_pages(pdf_path, page_count, &mut |page_number, image| {
        let prefix = scratch_dir.join(format!("page_{}", page_number));
        let stored = save_page_raster(image, pdf_path, page_number, &prefix, format);
        if let Some(slot) = page_number.checked_sub(1).and_then(|i| rasters.get_mut(i)) {
            *slot = Some(stored);
        }
    });

    let detail = match rendered {
        Ok(()) => "page was not rendered".to_string(),
        Err(e) => {
            warn!("Failed to open {} for rendering: {}", pdf_path.display(), e);
            e.to_string()
        }
    };

    rasters
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                Err(PageError::RenderFailed {
                    page: index + 1,
                    detail: detail.clone(),
                })
            })
        })
        .collect()
}

/// Save one rendered page as `{prefix}-1.{ext}`.
///
/// On `Err` no raster file is left behind, so callers can rely on the
/// file's existence alone.
pub fn save_page_raster(
    rendered: Result<DynamicImage, PageError>,
    pdf_path: &Path,
    page_number: usize,
    prefix: &Path,
    format: RasterFormat,
) -> Result<PathBuf, PageError> {
    let image = rendered.map_err(|e| {
        warn!("Failed to rasterise page {} of {}: {}", page_number, pdf_path.display(), e);
        e
    })?;

    let path = raster_image_path(prefix, 1, format);
    save_raster(&image, &path, format).map_err(|e| {
        // A half-written file would be mistaken for a successful render.
        let _ = std::fs::remove_file(&path);
        let err = PageError::SaveFailed {
            page: page_number,
            path: path.clone(),
            detail: e.to_string(),
        };
        warn!("{}", err);
        err
    })?;

    Ok(path)
}

fn save_raster(
    image: &DynamicImage,
    path: &Path,
    format: RasterFormat,
) -> Result<(), image::ImageError> {
    match format {
        RasterFormat::Png => image.save_with_format(path, format.image_format()),
        // JPEG has no alpha channel; pdfium renders RGBA.
        RasterFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .save_with_format(path, format.image_format()),
    }
}
