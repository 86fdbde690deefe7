//! Anchor location: turn literal text matches into scan coordinates.
//!
//! Two kinds of anchors are derived from the text layer:
//!
//! * the [`ScanWindow`], the vertical band shared by every page, bounded by
//!   the first match of the top label and the first match of the bottom
//!   label on page 1;
//! * per-page [`Marker`]s, which tell the classifier where a new question or
//!   a new choice begins.
//!
//! Question numbers are searched as `"{n}."` with `n` counting up from 1.
//! The counter only advances on a page where the current number was found,
//! so a page without a question number retries the same number on the next
//! page. Substring hits far to the right of the question-number column
//! (numbers inside choice text, `"11."` when looking for `"1."` and so on)
//! are filtered out against a reference column learned from the whole
//! document.

use crate::config::AnchorLabels;
use crate::error::CutError;
use crate::pipeline::source::{PageSource, TextBox};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Classification of a crop: a question stem or one of its choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropKind {
    Question,
    Choice,
}

impl CropKind {
    pub fn is_question(self) -> bool {
        matches!(self, CropKind::Question)
    }
}

/// Vertical scan band in raster pixels, `top` inclusive, `bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub top: u32,
    pub bottom: u32,
}

/// A located marker that starts a new crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// Left edge of the crop in raster pixels; `None` means the page's
    /// default left margin (column 0). Question markers always use `None`.
    pub cut_x: Option<u32>,
    /// Vertical centre of the match in raster pixels.
    pub center_y: u32,
    pub kind: CropKind,
}

impl Marker {
    fn question(b: &TextBox, scale: u32) -> Self {
        Self {
            cut_x: None,
            center_y: center_y(b, scale),
            kind: CropKind::Question,
        }
    }

    fn choice(b: &TextBox, scale: u32) -> Self {
        Self {
            cut_x: Some(scaled(b.x1, scale)),
            center_y: center_y(b, scale),
            kind: CropKind::Choice,
        }
    }

    /// Column where the crop starts.
    pub fn left(&self) -> u32 {
        self.cut_x.unwrap_or(0)
    }
}

/// Markers of one page, ordered by `center_y`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMarkers(Vec<Marker>);

impl PageMarkers {
    /// Sort candidates into scan order.
    ///
    /// Candidates must arrive question numbers first, then correct-choice
    /// matches, then incorrect-choice matches. The sort is stable, so that
    /// discovery order is the tie-break between markers sharing a row.
    pub fn from_candidates(mut markers: Vec<Marker>) -> Self {
        markers.sort_by_key(|m| m.center_y);
        Self(markers)
    }

    /// First marker (in stored order) whose centre lies strictly inside
    /// `(top, bottom)`.
    pub fn find_within(&self, top: u32, bottom: u32) -> Option<&Marker> {
        self.0.iter().find(|m| top < m.center_y && m.center_y < bottom)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the scanner needs from the text layer.
#[derive(Debug, Clone)]
pub struct Anchors {
    pub window: ScanWindow,
    /// One entry per page.
    pub pages: Vec<PageMarkers>,
    /// Leftmost right edge of any question-label match (unscaled units).
    pub question_ref: Option<f32>,
    /// Leftmost right edge of any correct-choice match (unscaled units).
    pub choice_ref: Option<f32>,
}

/// Locate the scan window and every page's markers.
pub fn locate_anchors(
    source: &dyn PageSource,
    labels: &AnchorLabels,
    scale: u32,
) -> Result<Anchors, CutError> {
    let window = scan_window(source, labels, scale)?;

    let total = source.page_count();
    let mut question_ref: Option<f32> = None;
    let mut choice_ref: Option<f32> = None;
    for page in 0..total {
        question_ref = min_right_edge(question_ref, &source.search_text(page, &labels.question)?);
        choice_ref = min_right_edge(choice_ref, &source.search_text(page, &labels.correct_choice)?);
    }
    debug!(
        "Reference columns: question={:?} choice={:?}",
        question_ref, choice_ref
    );

    let mut pages = Vec::with_capacity(total);
    let mut next_question = 1usize;
    for page in 0..total {
        let mut candidates = Vec::new();

        let numbers = source.search_text(page, &format!("{next_question}."))?;
        candidates.extend(
            numbers
                .iter()
                .filter(|b| within_column(b, question_ref))
                .map(|b| Marker::question(b, scale)),
        );
        if !candidates.is_empty() {
            next_question += 1;
        }

        for label in [&labels.correct_choice, &labels.incorrect_choice] {
            let hits = source.search_text(page, label)?;
            candidates.extend(
                hits.iter()
                    .filter(|b| within_column(b, choice_ref))
                    .map(|b| Marker::choice(b, scale)),
            );
        }

        let markers = PageMarkers::from_candidates(candidates);
        debug!("Page {}: {} marker(s)", page + 1, markers.len());
        pages.push(markers);
    }

    info!(
        "Anchors located: window {}..{} px, {} question(s) numbered across {} page(s)",
        window.top,
        window.bottom,
        next_question - 1,
        total
    );

    Ok(Anchors {
        window,
        pages,
        question_ref,
        choice_ref,
    })
}

/// Scan window from the first page's landmark labels.
pub fn scan_window(
    source: &dyn PageSource,
    labels: &AnchorLabels,
    scale: u32,
) -> Result<ScanWindow, CutError> {
    let first = |label: &str| -> Result<TextBox, CutError> {
        if source.page_count() == 0 {
            return Err(CutError::AnchorMissing {
                label: label.to_string(),
            });
        }
        source
            .search_text(0, label)?
            .into_iter()
            .next()
            .ok_or_else(|| CutError::AnchorMissing {
                label: label.to_string(),
            })
    };

    let top = first(&labels.top)?;
    let bottom = first(&labels.bottom)?;
    Ok(ScanWindow {
        top: scaled(top.y1, scale),
        bottom: scaled(bottom.y0, scale),
    })
}

fn min_right_edge(current: Option<f32>, hits: &[TextBox]) -> Option<f32> {
    hits.iter().fold(current, |acc, b| match acc {
        Some(r) if r <= b.x1 => Some(r),
        _ => Some(b.x1),
    })
}

/// An unset reference column admits nothing.
fn within_column(b: &TextBox, reference: Option<f32>) -> bool {
    reference.is_some_and(|r| b.x0 <= r)
}

fn scaled(v: f32, scale: u32) -> u32 {
    (v * scale as f32) as u32
}

fn center_y(b: &TextBox, scale: u32) -> u32 {
    ((b.y0 + b.y1) * scale as f32 / 2.0) as u32
}
