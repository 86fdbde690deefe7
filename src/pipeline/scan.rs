//! Row-gap scanning: split a page raster into content blocks.
//!
//! Inside the scan window every `scale`-th row is sampled at every
//! `scale`-th column (one sample per page unit). A sampled row is
//!
//! * a **rule** when its non-white samples, extrapolated back to full
//!   resolution, cover more than 70 % of the raster width. Rules are the
//!   horizontal lines that separate a question from its choices and one
//!   choice from the next;
//! * **blank** when no sample is non-white;
//! * **content** otherwise.
//!
//! Consecutive content rows between two rules form a [`ContentBlock`]. The
//! last sampled row of the window always closes the current block. Blank
//! rows neither open nor close a block, so text lines separated by ordinary
//! line spacing stay together.
//!
//! "White" means exactly `(255, 255, 255)`; anti-aliased grey counts as ink.

use crate::pipeline::anchor::ScanWindow;
use image::RgbImage;
use tracing::debug;

const WHITE: [u8; 3] = [255, 255, 255];

/// A vertical run of content rows, `top..=bottom` in raster pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBlock {
    pub top: u32,
    pub bottom: u32,
}

/// Classification of one sampled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Blank,
    Content,
    Rule,
}

/// Classify a row from its count of non-white samples.
///
/// The rule test is `non_white * scale > 0.7 * width`, evaluated in integers
/// as `10 * non_white * scale > 7 * width` so a row sitting exactly on the
/// threshold is content.
pub fn classify_row(non_white: u32, scale: u32, width: u32) -> RowKind {
    let extrapolated = u64::from(non_white) * u64::from(scale);
    if extrapolated * 10 > u64::from(width) * 7 {
        RowKind::Rule
    } else if non_white == 0 {
        RowKind::Blank
    } else {
        RowKind::Content
    }
}

/// Per-pixel "is pure white" mask, row-major.
pub fn white_mask(raster: &RgbImage) -> Vec<bool> {
    raster.pixels().map(|p| p.0 == WHITE).collect()
}

/// Scan one page raster and return its content blocks, top to bottom.
///
/// The window bottom is clamped to the raster height.
pub fn scan_blocks(raster: &RgbImage, window: ScanWindow, scale: u32) -> Vec<ContentBlock> {
    let step = scale.max(1);
    let (width, height) = raster.dimensions();
    let bottom = window.bottom.min(height);
    let last_row = bottom.saturating_sub(step);
    let mask = white_mask(raster);

    let mut blocks = Vec::new();
    let mut top = window.top;
    let mut bot = window.top;
    let mut is_first = true;

    let mut y = window.top;
    while y < bottom {
        let row = &mask[(y as usize * width as usize)..((y as usize + 1) * width as usize)];
        let non_white = row
            .iter()
            .step_by(step as usize)
            .filter(|&&white| !white)
            .count() as u32;

        match classify_row(non_white, step, width) {
            _ if y >= last_row => close_block(&mut blocks, &mut is_first, top, bot),
            RowKind::Rule => close_block(&mut blocks, &mut is_first, top, bot),
            RowKind::Content => {
                if is_first {
                    top = y;
                    is_first = false;
                }
                bot = y;
            }
            RowKind::Blank => {}
        }
        y += step;
    }

    debug!(
        "Scanned rows {}..{} of {}x{} raster → {} block(s)",
        window.top,
        bottom,
        width,
        height,
        blocks.len()
    );
    blocks
}

fn close_block(blocks: &mut Vec<ContentBlock>, is_first: &mut bool, top: u32, bot: u32) {
    // A block whose first and last content row coincide is dropped along
    // with empty ones.
    if !*is_first && top < bot {
        blocks.push(ContentBlock { top, bottom: bot });
    }
    *is_first = true;
}
