//! Result types returned by the cut and package entry points.

use crate::pipeline::anchor::CropKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One crop written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCrop {
    /// File name inside the output directory, e.g. `exam019.png`.
    pub file_name: String,
    /// Full path of the written file.
    pub path: PathBuf,
    pub kind: CropKind,
    /// 1-based question number the crop belongs to.
    pub question: u32,
    /// Choice index within the question; `None` for a question image.
    pub choice: Option<u32>,
    pub width: u32,
    pub height: u32,
    /// 1-based page the crop starts on.
    pub page: usize,
    /// Content blocks stacked into the image (> 1 for wrapped questions).
    pub segments: usize,
}

/// Counters for a finished cut.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutStats {
    pub total_pages: usize,
    pub questions: usize,
    pub choices: usize,
    /// Blocks stacked onto an earlier question crop.
    pub merged_blocks: usize,
    /// Unmarked blocks that followed a choice and were discarded.
    pub dropped_blocks: usize,
    pub duration_ms: u64,
}

impl CutStats {
    pub fn total_crops(&self) -> usize {
        self.questions + self.choices
    }
}

/// Output of [`crate::cut_pdf`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutOutput {
    /// Written files in scan order.
    pub files: Vec<SavedCrop>,
    pub stats: CutStats,
}

/// Output of [`crate::package::create_package`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageOutput {
    pub zip_path: PathBuf,
    /// Number of questions in the archive.
    pub questions: usize,
}
