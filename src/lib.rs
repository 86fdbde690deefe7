//! # quizcut
//!
//! Cut printed multiple-choice exam sheets into one image per question and
//! one image per answer choice, then package them as a QTI quiz.
//!
//! ## How it works
//!
//! The exam layout is found from the PDF's own text layer rather than from
//! pixel heuristics alone. Two landmark labels on page 1 (`"Version"` and
//! `"Page"` by default) bound the scan window on every page. Question numbers
//! (`"1."`, `"2."`, …) and choice markers (`"(O)"`, `"(X)"`) mark where each
//! crop begins. Inside the window, horizontal rules split the page into
//! content blocks; each block either starts a crop, continues the previous
//! question (also across page breaks), or is dropped.
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    validate path and %PDF magic
//!  ├─ 2. Anchors  text search: scan window + per-page markers
//!  ├─ 3. Scan     rasterise each page, split on ruled lines
//!  ├─ 4. Merge    start / continue / drop crops, carried across pages
//!  ├─ 5. Name     {prefix}{nn}9.png for questions, {prefix}{nn}{k}.png for choices
//!  └─ 6. Encode   PNG files in the output directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizcut::{cut_pdf, CutConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CutConfig::default();
//!     let output = cut_pdf("midterm.pdf", "out/midterm", "midterm", &config).await?;
//!     eprintln!(
//!         "{} questions, {} choices",
//!         output.stats.questions, output.stats.choices
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `quizcut` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! quizcut = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Rendering and text search use a pdfium shared library found through
//! `PDFIUM_LIB_PATH`, the current directory, or the system library path.
//! The segmentation core itself only sees the [`PageSource`] trait, so
//! pre-rendered pages can be cut with [`MemorySource`] and no pdfium at all.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod cut;
pub mod error;
pub mod jobs;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnchorLabels, CutConfig, CutConfigBuilder, PackageConfig, PackageConfigBuilder};
pub use cut::{cut_document, cut_pdf, cut_pdf_sync, cut_source};
pub use error::CutError;
pub use jobs::{CutRequest, JobHandle, JobId, JobRunner};
pub use output::{CutOutput, CutStats, PackageOutput, SavedCrop};
pub use package::create_package;
pub use pipeline::anchor::CropKind;
pub use pipeline::encode::save_crops;
pub use pipeline::merge::{Crop, ScanState};
pub use pipeline::source::{MemoryPage, MemorySource, PageSource, TextBox};
pub use progress::{CutProgressCallback, NoopProgressCallback, ProgressCallback};
