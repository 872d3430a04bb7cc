//! Per-document processing: rasterise, classify, drop blank pages, write.
//!
//! All pages are rendered in one pass, then classified strictly in order.
//! The source document is loaded once with `lopdf`; pages that should not survive are deleted
//! from it and the remainder is written out, so retained pages keep their
//! original objects and their original relative order.
//!
//! Per-page policy:
//!
//! | Situation                      | Outcome                | Counted blank |
//! |--------------------------------|------------------------|---------------|
//! | raster not produced            | page dropped           | no            |
//! | classified blank               | page removed           | yes           |
//! | classifier error               | page kept              | no            |
//! | classified not blank           | page kept              | no            |

use crate::config::{CleanerConfig, Thresholds};
use crate::error::{CleanError, PageError};
use crate::output::{DocumentReport, PageOutcome, PageVerdict};
use crate::pipeline::classify::classify_page;
use crate::pipeline::discover::{document_name, validate_pdf};
use crate::pipeline::render::{rasterize_document, PageRasterizer};
use lopdf::Document;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

type Classifier<'a> = &'a dyn Fn(&Path, usize, &Thresholds) -> Result<PageVerdict, PageError>;

/// Clean one PDF: write `input` minus its blank pages to `output`.
///
/// Page rasters live in a temporary folder that is removed when this
/// function returns, whatever the outcome.
///
/// # Errors
/// Returns `Err(CleanError)` only when the document as a whole cannot be
/// processed (missing, not a PDF, unparseable, output not writable).
/// Per-page problems never fail the document.
pub fn process_document(
    input: &Path,
    output: &Path,
    rasterizer: &dyn PageRasterizer,
    config: &CleanerConfig,
) -> Result<DocumentReport, CleanError> {
    process_with(input, output, rasterizer, config, &classify_page)
}

fn process_with(
    input: &Path,
    output: &Path,
    rasterizer: &dyn PageRasterizer,
    config: &CleanerConfig,
    classify: Classifier<'_>,
) -> Result<DocumentReport, CleanError> {
    let start = Instant::now();
    let name = document_name(input);

    // ── Step 1: Load ─────────────────────────────────────────────────────
    validate_pdf(input)?;
    let mut document = Document::load(input).map_err(|e| CleanError::CorruptPdf {
        path: input.to_path_buf(),
        detail: e.to_string(),
    })?;

    let total_pages = document.get_pages().len();
    info!("{}: {} pages", name, total_pages);
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(&name, total_pages);
    }

    // ── Step 2: Rasterise every page ─────────────────────────────────────
    let scratch = tempfile::Builder::new()
        .prefix("pdfclean-")
        .tempdir()
        .map_err(CleanError::TempDirFailed)?;
    let rasters = rasterize_document(
        rasterizer,
        input,
        total_pages,
        scratch.path(),
        config.raster_format,
    );

    // ── Step 3: Classify, in page order ──────────────────────────────────
    let thresholds = config.thresholds();
    let mut removed: Vec<u32> = Vec::new();
    let mut report = DocumentReport {
        name: name.clone(),
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        total_pages,
        retained_pages: 0,
        blank_pages: 0,
        dropped_pages: 0,
        classify_errors: 0,
        duration_ms: 0,
    };

    for (index, raster) in rasters.into_iter().enumerate() {
        let page_number = index + 1;

        let outcome = match raster {
            Err(e) => PageOutcome::Dropped(e),
            Ok(image_path) => match classify(&image_path, page_number, &thresholds) {
                Ok(PageVerdict::Blank(reason)) => PageOutcome::Blank(reason),
                Ok(PageVerdict::NotBlank) => PageOutcome::Retained,
                Err(e) => {
                    warn!("{}: keeping page {} after classifier error: {}", name, page_number, e);
                    PageOutcome::KeptOnError(e)
                }
            },
        };

        if outcome.is_retained() {
            report.retained_pages += 1;
        } else {
            removed.push(page_number as u32);
        }
        match &outcome {
            PageOutcome::KeptOnError(_) => report.classify_errors += 1,
            PageOutcome::Blank(reason) => {
                debug!("{}: page {} is blank ({:?})", name, page_number, reason);
                report.blank_pages += 1;
            }
            PageOutcome::Dropped(_) => report.dropped_pages += 1,
            PageOutcome::Retained => {}
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(&name, page_number, total_pages, &outcome);
        }
    }

    // ── Step 4: Write survivors ──────────────────────────────────────────
    if !removed.is_empty() {
        document.delete_pages(&removed);
        document.prune_objects();
    }
    write_document(&mut document, output)?;

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "{}: kept {}/{} pages ({} blank, {} dropped) in {}ms",
        name,
        report.retained_pages,
        total_pages,
        report.blank_pages,
        report.dropped_pages,
        report.duration_ms
    );
    Ok(report)
}

/// Serialise `document` to `path`.
///
/// The bytes go to a uniquely named temp file next to `path`, which is then
/// renamed over it, so a crash never leaves a truncated PDF at the
/// destination and two documents never share a temp file. The temp file is
/// removed if any step fails.
pub fn write_document(document: &mut Document, path: &Path) -> Result<(), CleanError> {
    let write_err = |source: std::io::Error| CleanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut buf = Vec::new();
    document
        .save_to(&mut buf)
        .map_err(|e| write_err(std::io::Error::other(e.to_string())))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".pdfclean-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(&buf).map_err(write_err)?;

    // Temp files are created owner-only; outputs get ordinary permissions.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", buf.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::output::BlankReason;
    use crate::progress::CleanProgressCallback;
    use image::{DynamicImage, GrayImage, Luma};
    use lopdf::{dictionary, Object, Stream};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Renders page N according to a fixed script.
    struct ScriptedRasterizer(Vec<&'static str>);

    impl PageRasterizer for ScriptedRasterizer {
        fn render_page(&self, _pdf: &Path, page_number: usize) -> Result<DynamicImage, PageError> {
            match self.0[page_number - 1] {
                "white" => Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
                    300,
                    300,
                    Luma([255]),
                ))),
                "fail" => Err(PageError::RenderFailed {
                    page: page_number,
                    detail: "scripted failure".into(),
                }),
                _ => {
                    let mut seed: u32 = 0x1234_5678 ^ page_number as u32;
                    Ok(DynamicImage::ImageLuma8(GrayImage::from_fn(300, 300, |_, _| {
                        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                        Luma([(seed >> 16) as u8 / 2])
                    })))
                }
            }
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(usize, PageOutcome)>>);

    impl CleanProgressCallback for Recorder {
        fn on_page_complete(&self, _name: &str, page: usize, _total: usize, outcome: &PageOutcome) {
            self.0.lock().unwrap().push((page, outcome.clone()));
        }
    }

    fn write_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for n in 1..=pages {
            let content = format!("BT /F1 12 Tf 72 720 Td (page {}) Tj ET", n);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = dir.join(name);
        doc.save(&path).unwrap();
        path
    }

    fn page_texts(path: &Path) -> Vec<String> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
            .collect()
    }

    #[test]
    fn blank_page_is_removed_and_order_kept() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 3);
        let output = dir.path().join("out.pdf");
        let rasterizer = ScriptedRasterizer(vec!["text", "white", "text"]);

        let report =
            process_document(&input, &output, &rasterizer, &CleanerConfig::default()).unwrap();

        assert_eq!(report.total_pages, 3);
        assert_eq!(report.blank_pages, 1);
        assert_eq!(report.retained_pages, 2);
        assert_eq!(report.dropped_pages, 0);

        let texts = page_texts(&output);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("(page 1)"));
        assert!(texts[1].contains("(page 3)"));
    }

    #[test]
    fn failed_render_drops_without_counting() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 2);
        let output = dir.path().join("out.pdf");
        let rasterizer = ScriptedRasterizer(vec!["fail", "text"]);

        let report =
            process_document(&input, &output, &rasterizer, &CleanerConfig::default()).unwrap();

        assert_eq!(report.blank_pages, 0);
        assert_eq!(report.dropped_pages, 1);
        let texts = page_texts(&output);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("(page 2)"));
    }

    #[test]
    fn all_blank_document_is_written_empty() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 2);
        let output = dir.path().join("out.pdf");
        let rasterizer = ScriptedRasterizer(vec!["white", "white"]);

        let report =
            process_document(&input, &output, &rasterizer, &CleanerConfig::default()).unwrap();

        assert_eq!(report.blank_pages, 2);
        assert_eq!(report.retained_pages, 0);
        assert!(page_texts(&output).is_empty());
    }

    #[test]
    fn progress_sees_every_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 3);
        let output = dir.path().join("out.pdf");
        let recorder = Arc::new(Recorder::default());
        let config = CleanerConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();

        process_document(
            &input,
            &output,
            &ScriptedRasterizer(vec!["white", "fail", "text"]),
            &config,
        )
        .unwrap();

        let events = recorder.0.lock().unwrap();
        let pages: Vec<usize> = events.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(events[0].1, PageOutcome::Blank(BlankReason::NoContent));
        assert!(matches!(events[1].1, PageOutcome::Dropped(_)));
        assert_eq!(events[2].1, PageOutcome::Retained);
    }

    #[test]
    fn non_pdf_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fake.pdf");
        std::fs::write(&input, b"hello world").unwrap();
        let err = process_document(
            &input,
            &dir.path().join("out.pdf"),
            &ScriptedRasterizer(vec![]),
            &CleanerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CleanError::NotAPdf { .. }));
    }

    #[test]
    fn write_into_missing_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 1);
        let mut doc = Document::load(&input).unwrap();
        let err = write_document(&mut doc, &dir.path().join("nope").join("out.pdf")).unwrap_err();
        assert!(matches!(err, CleanError::OutputWriteFailed { .. }));
    }

    #[test]
    fn classifier_error_keeps_page() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 3);
        let output = dir.path().join("out.pdf");
        let recorder = Arc::new(Recorder::default());
        let config = CleanerConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();

        // Page 2's raster is clobbered before the real classifier reads it.
        let clobber_page_2 = |path: &Path, page: usize, thresholds: &Thresholds| {
            if page == 2 {
                std::fs::write(path, b"not an image").unwrap();
            }
            classify_page(path, page, thresholds)
        };

        let report = process_with(
            &input,
            &output,
            &ScriptedRasterizer(vec!["text", "white", "text"]),
            &config,
            &clobber_page_2,
        )
        .unwrap();

        assert_eq!(report.retained_pages, 3);
        assert_eq!(report.classify_errors, 1);
        assert_eq!(report.blank_pages, 0);
        assert_eq!(report.dropped_pages, 0);
        assert!(matches!(
            recorder.0.lock().unwrap()[1].1,
            PageOutcome::KeptOnError(PageError::ClassifyFailed { page: 2, .. })
        ));

        let texts = page_texts(&output);
        assert_eq!(texts.len(), 3);
        assert!(texts[1].contains("(page 2)"));
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 1);
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        // A directory squats on the destination, so the final rename fails.
        let target = out_dir.join("in.pdf");
        std::fs::create_dir(&target).unwrap();

        let mut doc = Document::load(&input).unwrap();
        let err = write_document(&mut doc, &target).unwrap_err();

        assert!(matches!(err, CleanError::OutputWriteFailed { .. }));
        let left: Vec<_> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("in.pdf")]);
    }

    #[test]
    fn write_replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_pdf(dir.path(), "in.pdf", 2);
        let target = dir.path().join("out.pdf");
        std::fs::write(&target, b"stale").unwrap();

        let mut doc = Document::load(&input).unwrap();
        write_document(&mut doc, &target).unwrap();

        assert_eq!(page_texts(&target).len(), 2);
    }
}
