//! Block classification and merging.
//!
//! Each content block from the scanner either starts a new crop or extends
//! the previous one:
//!
//! * a block containing a marker (first one in the page's marker order
//!   wins) starts a new crop at the marker's left cut;
//! * a block without a marker that follows a question crop is a wrapped
//!   question line and is stacked under that crop;
//! * a block without a marker that follows a choice crop, or arrives before
//!   any crop exists, is dropped.
//!
//! The last case is a long-standing behaviour of the format: stray rows after
//! a choice are discarded rather than attached to it. Crop numbering depends
//! on it, so it is kept and only counted.
//!
//! [`ScanState`] is the only state that lives for the whole document. The
//! left cut and the crop list carry over page breaks, which is what lets a
//! question continue on the next page.

use crate::pipeline::anchor::{CropKind, PageMarkers};
use crate::pipeline::scan::ContentBlock;
use image::{imageops, Rgb, RgbImage};
use tracing::{debug, warn};

/// One output image.
#[derive(Debug, Clone)]
pub struct Crop {
    pub image: RgbImage,
    pub kind: CropKind,
    /// 0-based page the crop starts on.
    pub page: usize,
    /// Number of content blocks stacked into this crop.
    pub segments: usize,
}

/// What happened to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Started(CropKind),
    Merged,
    Dropped,
}

/// Document-wide scan state.
///
/// The classification of each crop is stored on the crop itself, so the
/// crop list and its flag sequence always have the same length.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    left_cut: u32,
    crops: Vec<Crop>,
    merged_blocks: usize,
    dropped_blocks: usize,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column where the current crop (and its continuations) start.
    pub fn left_cut(&self) -> u32 {
        self.left_cut
    }

    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    pub fn into_crops(self) -> Vec<Crop> {
        self.crops
    }

    /// Classification flags, parallel to [`ScanState::crops`].
    pub fn flags(&self) -> impl Iterator<Item = CropKind> + '_ {
        self.crops.iter().map(|c| c.kind)
    }

    pub fn merged_blocks(&self) -> usize {
        self.merged_blocks
    }

    pub fn dropped_blocks(&self) -> usize {
        self.dropped_blocks
    }

    /// Classify one block of `raster` and update the crop list.
    ///
    /// `margin` is in raster pixels.
    pub fn apply_block(
        &mut self,
        block: ContentBlock,
        markers: &PageMarkers,
        raster: &RgbImage,
        margin: u32,
        page: usize,
    ) -> BlockOutcome {
        if let Some(marker) = markers.find_within(block.top, block.bottom) {
            self.left_cut = marker.left();
            let image = cut_region(raster, self.left_cut, block, margin);
            debug!(
                "Page {}: {:?} crop {} at rows {}..={} from x={} ({}x{})",
                page + 1,
                marker.kind,
                self.crops.len(),
                block.top,
                block.bottom,
                self.left_cut,
                image.width(),
                image.height()
            );
            self.crops.push(Crop {
                image,
                kind: marker.kind,
                page,
                segments: 1,
            });
            return BlockOutcome::Started(marker.kind);
        }

        match self.crops.last_mut() {
            Some(last) if last.kind.is_question() => {
                let segment = cut_region(raster, self.left_cut, block, margin);
                last.image = stack(&last.image, &segment);
                last.segments += 1;
                self.merged_blocks += 1;
                debug!(
                    "Page {}: rows {}..={} continue question crop (now {}px tall)",
                    page + 1,
                    block.top,
                    block.bottom,
                    last.image.height()
                );
                BlockOutcome::Merged
            }
            _ => {
                self.dropped_blocks += 1;
                warn!(
                    "Page {}: unmarked rows {}..={} follow a choice or precede any crop; dropped",
                    page + 1,
                    block.top,
                    block.bottom
                );
                BlockOutcome::Dropped
            }
        }
    }
}

/// Rows `[top - margin, bottom + margin)` by columns `[left, width)`,
/// clamped to the raster.
pub fn cut_region(raster: &RgbImage, left: u32, block: ContentBlock, margin: u32) -> RgbImage {
    let (width, height) = raster.dimensions();
    let y0 = block.top.saturating_sub(margin).min(height);
    let y1 = block.bottom.saturating_add(margin).min(height);
    let x0 = left.min(width);
    imageops::crop_imm(raster, x0, y0, width - x0, y1.saturating_sub(y0)).to_image()
}

/// Stack `lower` under `upper`, keeping `upper`'s width.
///
/// A wider `lower` is clipped on the right; a narrower one leaves white
/// on the right.
fn stack(upper: &RgbImage, lower: &RgbImage) -> RgbImage {
    let mut out = RgbImage::from_pixel(
        upper.width(),
        upper.height() + lower.height(),
        Rgb([255, 255, 255]),
    );
    imageops::replace(&mut out, upper, 0, 0);
    imageops::replace(&mut out, lower, 0, i64::from(upper.height()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::anchor::Marker;

    fn raster() -> RgbImage {
        RgbImage::from_fn(100, 200, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 7]))
    }

    fn question_at(y: u32) -> Marker {
        Marker {
            cut_x: None,
            center_y: y,
            kind: CropKind::Question,
        }
    }

    fn choice_at(x: u32, y: u32) -> Marker {
        Marker {
            cut_x: Some(x),
            center_y: y,
            kind: CropKind::Choice,
        }
    }

    fn markers(list: Vec<Marker>) -> PageMarkers {
        PageMarkers::from_candidates(list)
    }

    #[test]
    fn cut_region_clamps_to_raster() {
        let r = raster();
        let img = cut_region(&r, 10, ContentBlock { top: 3, bottom: 195 }, 8);
        assert_eq!(img.dimensions(), (90, 200));
        assert_eq!(img.get_pixel(0, 0), &Rgb([10, 0, 7]));

        let img = cut_region(&r, 250, ContentBlock { top: 50, bottom: 60 }, 2);
        assert_eq!(img.dimensions(), (0, 14));

        let img = cut_region(&r, 0, ContentBlock { top: 50, bottom: 60 }, u32::MAX);
        assert_eq!(img.dimensions(), (100, 200));
    }

    #[test]
    fn marked_blocks_start_crops() {
        let r = raster();
        let m = markers(vec![question_at(20), choice_at(30, 60)]);
        let mut s = ScanState::new();

        let q = s.apply_block(ContentBlock { top: 10, bottom: 30 }, &m, &r, 4, 0);
        assert_eq!(q, BlockOutcome::Started(CropKind::Question));
        assert_eq!(s.left_cut(), 0);
        assert_eq!(s.crops()[0].image.dimensions(), (100, 28));

        let c = s.apply_block(ContentBlock { top: 50, bottom: 70 }, &m, &r, 4, 0);
        assert_eq!(c, BlockOutcome::Started(CropKind::Choice));
        assert_eq!(s.left_cut(), 30);
        assert_eq!(s.crops()[1].image.dimensions(), (70, 28));
        assert_eq!(s.crops()[1].image.get_pixel(0, 0), &Rgb([30, 46, 7]));

        assert_eq!(
            s.flags().collect::<Vec<_>>(),
            vec![CropKind::Question, CropKind::Choice]
        );
    }

    #[test]
    fn first_marker_in_block_wins() {
        let r = raster();
        let m = markers(vec![choice_at(40, 25), question_at(25)]);
        let mut s = ScanState::new();
        s.apply_block(ContentBlock { top: 10, bottom: 40 }, &m, &r, 0, 0);
        assert_eq!(s.crops().len(), 1);
        assert_eq!(s.crops()[0].kind, CropKind::Choice);
    }

    #[test]
    fn continuation_after_question_is_stacked() {
        let r = raster();
        let m = markers(vec![question_at(20)]);
        let mut s = ScanState::new();
        s.apply_block(ContentBlock { top: 10, bottom: 30 }, &m, &r, 4, 0);
        let out = s.apply_block(ContentBlock { top: 100, bottom: 120 }, &m, &r, 4, 0);
        assert_eq!(out, BlockOutcome::Merged);
        assert_eq!(s.crops().len(), 1);
        let crop = &s.crops()[0];
        assert_eq!(crop.segments, 2);
        assert_eq!(crop.image.dimensions(), (100, 28 + 28));
        // Second segment starts at raster row 96.
        assert_eq!(crop.image.get_pixel(5, 28), &Rgb([5, 96, 7]));
        assert_eq!(s.merged_blocks(), 1);
    }

    #[test]
    fn continuation_after_choice_is_dropped() {
        let r = raster();
        let m = markers(vec![question_at(20), choice_at(30, 60)]);
        let mut s = ScanState::new();
        s.apply_block(ContentBlock { top: 10, bottom: 30 }, &m, &r, 4, 0);
        s.apply_block(ContentBlock { top: 50, bottom: 70 }, &m, &r, 4, 0);
        let before = s.crops()[1].image.clone();

        let out = s.apply_block(ContentBlock { top: 150, bottom: 170 }, &m, &r, 4, 0);
        assert_eq!(out, BlockOutcome::Dropped);
        assert_eq!(s.crops().len(), 2);
        assert_eq!(s.crops()[1].image, before);
        assert_eq!(s.dropped_blocks(), 1);
    }

    #[test]
    fn continuation_before_any_crop_is_dropped() {
        let r = raster();
        let mut s = ScanState::new();
        let out = s.apply_block(
            ContentBlock { top: 10, bottom: 30 },
            &PageMarkers::default(),
            &r,
            4,
            0,
        );
        assert_eq!(out, BlockOutcome::Dropped);
        assert!(s.crops().is_empty());
    }

    #[test]
    fn narrower_segment_is_padded_white() {
        let upper = RgbImage::from_pixel(10, 2, Rgb([0, 0, 0]));
        let lower = RgbImage::from_pixel(4, 3, Rgb([1, 1, 1]));
        let out = stack(&upper, &lower);
        assert_eq!(out.dimensions(), (10, 5));
        assert_eq!(out.get_pixel(3, 4), &Rgb([1, 1, 1]));
        assert_eq!(out.get_pixel(9, 4), &Rgb([255, 255, 255]));

        let wider = RgbImage::from_pixel(20, 1, Rgb([2, 2, 2]));
        assert_eq!(stack(&upper, &wider).dimensions(), (10, 3));
    }
}
