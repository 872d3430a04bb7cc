//! Pipeline stages for blank-page removal.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the rendering backend can be replaced without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ document ──▶ render ──▶ classify
//! (folder)     (lopdf)      (pdfium)   (image stats)
//! ```
//!
//! 1. [`discover`] — list `*.pdf` in the input folder, pair each with its
//!    output path
//! 2. [`document`] — walk one document page by page and write the survivors
//! 3. [`render`]   — rasterise a document's pages into temporary image files
//! 4. [`classify`] — decide blank / not blank from the raster

pub mod classify;
pub mod discover;
pub mod document;
pub mod render;
