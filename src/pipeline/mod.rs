//! Pipeline stages for exam-sheet segmentation.
//!
//! Each submodule implements one step. Only [`source`] and [`encode`] touch
//! pdfium or the file system; the stages in between are pure functions over
//! rasters and boxes, which is what the tests drive directly.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──▶ anchor ──▶ scan ──▶ merge ──▶ naming ──▶ encode
//! (path)   (pdfium)   (labels)   (rows)   (crops)   (names)    (PNG)
//! ```
//!
//! 1. [`input`] : validate the PDF path and magic bytes
//! 2. [`source`]: text search and rasterisation behind the [`source::PageSource`] trait
//! 3. [`anchor`]: scan window from page 1, per-page question/choice markers
//! 4. [`scan`]  : sample rows inside the window and split on ruled lines
//! 5. [`merge`] : start, stack or drop each block; state carries across pages
//! 6. [`naming`]: deterministic file names from the crop kinds
//! 7. [`encode`]: write PNGs

pub mod anchor;
pub mod encode;
pub mod input;
pub mod merge;
pub mod naming;
pub mod scan;
pub mod source;
