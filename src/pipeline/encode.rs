//! Crop encoding: `RgbImage` → PNG file in the output directory.
//!
//! PNG keeps printed text lossless. Files are named by
//! [`naming::assign_names`] in scan order, and the directory is created on
//! first use.

use crate::error::CutError;
use crate::output::SavedCrop;
use crate::pipeline::merge::Crop;
use crate::pipeline::naming;
use crate::progress::ProgressCallback;
use image::RgbImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encode a crop as PNG bytes.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} crop → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Name and write every crop to `output_dir`.
///
/// Existing files with the same names are overwritten.
pub fn save_crops(
    crops: &[Crop],
    output_dir: &Path,
    prefix: &str,
    question_suffix: &str,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<SavedCrop>, CutError> {
    std::fs::create_dir_all(output_dir).map_err(|e| CutError::OutputWriteFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let names = naming::assign_names(crops.iter().map(|c| c.kind), prefix, question_suffix);
    let mut saved = Vec::with_capacity(crops.len());

    for (crop, name) in crops.iter().zip(names) {
        let path = output_dir.join(&name.file_name);
        let bytes = encode_png(&crop.image).map_err(|e| CutError::EncodeFailed {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, &bytes).map_err(|e| CutError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

        if let Some(cb) = progress {
            cb.on_crop_saved(&name.file_name);
        }
        saved.push(SavedCrop {
            file_name: name.file_name,
            path,
            kind: crop.kind,
            question: name.question,
            choice: name.choice,
            width: crop.image.width(),
            height: crop.image.height(),
            page: crop.page + 1,
            segments: crop.segments,
        });
    }

    Ok(saved)
}
