//! Document-level cutting entry points.
//!
//! [`cut_document`] is the pure core: it walks every page of a
//! [`PageSource`] in order and returns the accumulated [`ScanState`].
//! [`cut_source`] adds naming and PNG output, and [`cut_pdf`] wraps both
//! around a pdfium-backed source on a blocking worker thread.
//!
//! Every failure aborts the whole document. In particular a missing anchor
//! label is detected before anything is written, so a failed job leaves the
//! output directory untouched.

use crate::config::CutConfig;
use crate::error::CutError;
use crate::output::{CutOutput, CutStats};
use crate::pipeline::anchor::{locate_anchors, CropKind};
use crate::pipeline::encode::save_crops;
use crate::pipeline::input;
use crate::pipeline::merge::{BlockOutcome, ScanState};
use crate::pipeline::scan::scan_blocks;
use crate::pipeline::source::{bind_pdfium, open_document, PageSource, PdfiumSource};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Segment every page of `source` into question and choice crops.
///
/// Returns [`CutError::NoContentFound`] when the scan produces no crop.
pub fn cut_document(source: &dyn PageSource, config: &CutConfig) -> Result<ScanState, CutError> {
    let scale = config.resolution;
    let margin = config.scaled_margin();
    let anchors = locate_anchors(source, &config.labels, scale)?;

    let total_pages = source.page_count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_job_start(total_pages);
    }

    let mut state = ScanState::new();
    for (page, markers) in anchors.pages.iter().enumerate() {
        let page_num = page + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }

        let raster = source.render(page, scale)?;
        let blocks = scan_blocks(&raster, anchors.window, scale);

        let mut started = 0usize;
        for block in blocks {
            let outcome = state.apply_block(block, markers, &raster, margin, page);
            if let BlockOutcome::Started(_) = outcome {
                started += 1;
            }
        }
        debug!(
            "Page {}/{}: {} new crop(s), {} total",
            page_num,
            total_pages,
            started,
            state.crops().len()
        );

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, total_pages, state.crops().len());
        }
    }

    if state.crops().is_empty() {
        return Err(CutError::NoContentFound);
    }
    Ok(state)
}

/// Cut `source` and write the crops to `output_dir` as `{prefix}…png`.
pub fn cut_source(
    source: &dyn PageSource,
    output_dir: &Path,
    prefix: &str,
    config: &CutConfig,
) -> Result<CutOutput, CutError> {
    let start = Instant::now();
    let state = cut_document(source, config)?;

    let files = save_crops(
        state.crops(),
        output_dir,
        prefix,
        &config.question_suffix,
        config.progress_callback.as_ref(),
    )?;

    let questions = state.flags().filter(|k| *k == CropKind::Question).count();
    let stats = CutStats {
        total_pages: source.page_count(),
        questions,
        choices: files.len() - questions,
        merged_blocks: state.merged_blocks(),
        dropped_blocks: state.dropped_blocks(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_job_complete(stats.total_crops());
    }

    Ok(CutOutput { files, stats })
}

/// Cut a PDF file into question and choice images.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `pdf_path`  : Local PDF file
/// * `output_dir`: Directory for the PNGs (created if missing)
/// * `prefix`    : File-name prefix, usually the exam name
/// * `config`    : Cut configuration
///
/// # Errors
/// Any error aborts the document: invalid input, missing anchor labels,
/// rendering or encoding failures, or a scan that finds nothing.
pub async fn cut_pdf(
    pdf_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    prefix: &str,
    config: &CutConfig,
) -> Result<CutOutput, CutError> {
    let pdf_path = input::resolve_input(pdf_path)?;
    let output_dir = output_dir.as_ref().to_path_buf();
    let prefix = prefix.to_string();
    let config = config.clone();
    info!("Starting cut: {}", pdf_path.display());

    let output = tokio::task::spawn_blocking(move || {
        cut_pdf_blocking(&pdf_path, &output_dir, &prefix, &config)
    })
    .await
    .map_err(|e| CutError::Internal(format!("Cut task panicked: {}", e)))??;

    info!(
        "Cut complete: {} question(s), {} choice(s) from {} page(s) in {}ms",
        output.stats.questions,
        output.stats.choices,
        output.stats.total_pages,
        output.stats.duration_ms
    );
    Ok(output)
}

/// Synchronous wrapper around [`cut_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn cut_pdf_sync(
    pdf_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    prefix: &str,
    config: &CutConfig,
) -> Result<CutOutput, CutError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CutError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(cut_pdf(pdf_path, output_dir, prefix, config))
}

/// Blocking body of [`cut_pdf`]; pdfium handles never leave this thread.
fn cut_pdf_blocking(
    pdf_path: &Path,
    output_dir: &Path,
    prefix: &str,
    config: &CutConfig,
) -> Result<CutOutput, CutError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, config.password.as_deref())?;
    let source = PdfiumSource::new(document);
    info!("PDF loaded: {} pages", source.page_count());
    cut_source(&source, output_dir, prefix, config)
}
