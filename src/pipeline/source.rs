//! Page sources: the text-search and rasterisation backend.
//!
//! The segmentation core only needs two things from a document: literal
//! text search returning bounding boxes, and a raster of the page at an
//! integer scale. [`PageSource`] is that seam. [`PdfiumSource`] implements it
//! on top of `pdfium-render`; [`MemorySource`] implements it over raster
//! images already in memory (scanned pages with a sidecar text layer, and
//! every test in this crate).
//!
//! ## Coordinates
//!
//! [`TextBox`] uses unscaled page units with the origin at the top-left
//! corner and y growing downward, the same orientation as the raster. PDF
//! user space has its origin bottom-left, so `PdfiumSource` flips y using
//! the page height.

use crate::error::CutError;
use image::{imageops, RgbImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bounding box of a text match, in unscaled page units (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl TextBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    fn union(self, other: TextBox) -> TextBox {
        TextBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// A paged document that can be searched and rasterised.
///
/// Page indices are 0-based; errors report 1-based page numbers.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Every occurrence of `needle` on the page (exact, case-sensitive), in
    /// the backend's search order.
    fn search_text(&self, page: usize, needle: &str) -> Result<Vec<TextBox>, CutError>;

    /// Render the page with both axes scaled by `scale`.
    fn render(&self, page: usize, scale: u32) -> Result<RgbImage, CutError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Bind to a pdfium shared library.
///
/// Resolution order: `PDFIUM_LIB_PATH` (a library file or the directory
/// holding it), then the current directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, CutError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| CutError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a PDF, mapping pdfium's load errors onto [`CutError`].
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, CutError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                CutError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                CutError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            CutError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// [`PageSource`] backed by a pdfium document.
pub struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumSource<'a> {
    pub fn new(document: PdfDocument<'a>) -> Self {
        Self { document }
    }

    fn page(&self, idx: usize) -> Result<PdfPage<'a>, PdfiumError> {
        self.document.pages().get(idx as u16)
    }
}

impl<'a> PageSource for PdfiumSource<'a> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn search_text(&self, idx: usize, needle: &str) -> Result<Vec<TextBox>, CutError> {
        let search_err = |e: PdfiumError| CutError::TextSearchFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        };

        let page = self.page(idx).map_err(search_err)?;
        let page_height = page.height().value;
        let text = page.text().map_err(search_err)?;
        let options = PdfSearchOptions::new()
            .match_case(true)
            .match_whole_word(false);
        let search = text.search(needle, &options).map_err(search_err)?;

        let mut boxes = Vec::new();
        for segments in search.iter(PdfSearchDirection::SearchForward) {
            // A match that wraps across text runs comes back as several
            // segments; the anchor is their union.
            let mut found: Option<TextBox> = None;
            for segment in segments.iter() {
                let rect = segment.bounds();
                let b = TextBox::new(
                    rect.left().value,
                    page_height - rect.top().value,
                    rect.right().value,
                    page_height - rect.bottom().value,
                );
                found = Some(found.map_or(b, |f| f.union(b)));
            }
            if let Some(b) = found {
                boxes.push(b);
            }
        }

        debug!(
            "Page {}: {} match(es) for {:?}",
            idx + 1,
            boxes.len(),
            needle
        );
        Ok(boxes)
    }

    fn render(&self, idx: usize, scale: u32) -> Result<RgbImage, CutError> {
        let render_err = |e: PdfiumError| CutError::RenderFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        };

        let page = self.page(idx).map_err(render_err)?;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale as f32);
        let bitmap = page.render_with_config(&render_config).map_err(render_err)?;

        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

// ── In-memory ────────────────────────────────────────────────────────────

/// One pre-rendered page with its text layer.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    /// Raster at `scale` pixels per page unit.
    pub raster: RgbImage,
    /// Scale the raster was produced at.
    pub scale: u32,
    /// Text runs with their boxes, in reading order.
    pub runs: Vec<(String, TextBox)>,
}

impl MemoryPage {
    pub fn new(raster: RgbImage, scale: u32) -> Self {
        Self {
            raster,
            scale: scale.max(1),
            runs: Vec::new(),
        }
    }

    /// Add a text run; `b` is in unscaled page units.
    pub fn with_text(mut self, text: impl Into<String>, b: TextBox) -> Self {
        self.runs.push((text.into(), b));
        self
    }
}

/// [`PageSource`] over in-memory rasters.
///
/// Search reports the box of every run that contains the needle as a
/// substring, so `"1."` also hits a run reading `"11."`, like a real text
/// layer would.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<MemoryPage>,
}

impl MemorySource {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    fn page(&self, idx: usize) -> Result<&MemoryPage, CutError> {
        self.pages.get(idx).ok_or_else(|| CutError::RenderFailed {
            page: idx + 1,
            detail: format!("page index out of range (document has {})", self.pages.len()),
        })
    }
}

impl PageSource for MemorySource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn search_text(&self, idx: usize, needle: &str) -> Result<Vec<TextBox>, CutError> {
        let page = self.pages.get(idx).ok_or_else(|| CutError::TextSearchFailed {
            page: idx + 1,
            detail: "page index out of range".into(),
        })?;
        Ok(page
            .runs
            .iter()
            .filter(|(text, _)| text.contains(needle))
            .map(|(_, b)| *b)
            .collect())
    }

    fn render(&self, idx: usize, scale: u32) -> Result<RgbImage, CutError> {
        let page = self.page(idx)?;
        if page.scale == scale {
            return Ok(page.raster.clone());
        }
        let w = page.raster.width() * scale / page.scale;
        let h = page.raster.height() * scale / page.scale;
        Ok(imageops::resize(
            &page.raster,
            w.max(1),
            h.max(1),
            imageops::FilterType::Nearest,
        ))
    }
}
