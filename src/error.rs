//! Error types for the quizcut library.
//!
//! Every failure is fatal to the document it happened in. A cut either
//! produces the complete, consistently named set of crop images or it fails
//! and says why; there is no partial-success mode because the downstream
//! packager infers question/choice structure purely from file names, and a
//! half-written sequence would silently renumber questions.
//!
//! The job runner wraps the cause once in [`CutError::JobFailed`] so the
//! caller can tell which document failed when several run side by side.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the quizcut library.
#[derive(Debug, Error)]
pub enum CutError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory), place the library\n\
next to the executable, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Segmentation errors ───────────────────────────────────────────────
    /// A landmark label that bounds the scan window is absent on page 1.
    #[error("Anchor label '{label}' not found on the first page")]
    AnchorMissing { label: String },

    /// The text layer of a page could not be searched.
    #[error("Text search failed on page {page}: {detail}")]
    TextSearchFailed { page: usize, detail: String },

    /// pdfium-render could not rasterise a page.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The scan finished without producing a single crop.
    #[error("No question or choice content found inside the scan window")]
    NoContentFound,

    // ── Output errors ─────────────────────────────────────────────────────
    /// A crop image could not be encoded or written.
    #[error("Failed to encode crop image '{path}': {source}")]
    EncodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Could not create the output directory or write an output file.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Packaging errors ──────────────────────────────────────────────────
    /// No `{name}{nn}{suffix}.png` question image with choices was found.
    #[error("No valid questions found for '{name}' in '{dir}'")]
    NoQuestionsFound { name: String, dir: PathBuf },

    /// The quiz archive could not be assembled.
    #[error("Failed to create package '{path}': {detail}")]
    PackageFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or option-object validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Job errors ────────────────────────────────────────────────────────
    /// A job submitted to [`crate::jobs::JobRunner`] failed.
    #[error("Job {job} failed: {source}")]
    JobFailed {
        job: u64,
        #[source]
        source: Box<CutError>,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CutError {
    /// The innermost error, looking through [`CutError::JobFailed`].
    pub fn root_cause(&self) -> &CutError {
        match self {
            CutError::JobFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_missing_display() {
        let e = CutError::AnchorMissing {
            label: "Version".into(),
        };
        assert!(e.to_string().contains("'Version'"), "got: {e}");
    }

    #[test]
    fn render_failed_display() {
        let e = CutError::RenderFailed {
            page: 3,
            detail: "bitmap alloc".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("bitmap alloc"));
    }

    #[test]
    fn job_failed_keeps_cause() {
        let e = CutError::JobFailed {
            job: 7,
            source: Box::new(CutError::NoContentFound),
        };
        assert!(e.to_string().contains("Job 7"));
        assert!(matches!(e.root_cause(), CutError::NoContentFound));
    }

    #[test]
    fn no_questions_display() {
        let e = CutError::NoQuestionsFound {
            name: "midterm".into(),
            dir: PathBuf::from("/tmp/out"),
        };
        assert!(e.to_string().contains("midterm"));
    }
}
