//! Zone density scorer
//!
//! Decides which of the five answer zones on a question row was marked.
//! Nothing is compared against an absolute "marked" level alone: the winning
//! zone must stand out from the other zones on its own row and from the
//! page's own noise floor, measured along the page edges.
//!
//! # Algorithm
//!
//! 1. Build five zones from the grid lines right of the question column, or
//!    split the answer span evenly when too few lines were found
//! 2. Measure the ink fraction of each zone
//! 3. Accept the densest zone `W` (density `M`, mean of the others `A`) when
//!    `M > max(2 * baseline, 1.5 * A) * multiplier`, `M > 0.015`, and
//!    `A == 0 || M > 2 * A`
//! 4. Retry with the next, smaller multiplier; after the last one the row is
//!    left unscored

use crate::binarize::InkMap;
use crate::grid::filter_grid_lines;
use image::GrayImage;
use rubric_core::{
    AnchorBox, BoundingBox, FormLayout, QuestionId, Score, ScoreResult, QUESTION_IDS,
    SCORE_SCALE,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of answer zones per row
pub const ZONE_COUNT: usize = SCORE_SCALE.len();

/// One candidate answer region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    /// Column index, left to right
    pub column: usize,
    pub rect: BoundingBox,
}

/// Outcome of scoring one row
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDecision {
    /// Accepted column, if any
    pub column: Option<usize>,
    /// Ink fraction per zone from the last attempt
    pub densities: [f32; ZONE_COUNT],
    /// Scoring attempts made (1 when the first attempt succeeded)
    pub attempts: usize,
}

impl ZoneDecision {
    #[must_use]
    pub fn score(&self) -> Option<Score> {
        self.column.and_then(Score::from_column)
    }
}

/// Vertical span of a question row: the anchor box padded above and below
fn row_span(anchor: &BoundingBox, layout: &FormLayout) -> (u32, u32) {
    let top = anchor.y.saturating_sub(layout.row_pad_above);
    let bottom = anchor.bottom().saturating_add(layout.row_pad_below);
    (top, bottom - top)
}

/// Shrink `[left, right)` by `inset` on both sides
fn inset_span(left: u32, right: u32, inset: u32) -> (u32, u32) {
    let l = left.saturating_add(inset);
    let r = right.saturating_sub(inset);
    (l, r.saturating_sub(l))
}

/// Column boundaries taken from the grid, or `None` when the grid is too
/// sparse to provide five columns.
///
/// Six or more lines: the rightmost six delimit the five columns. Exactly
/// five: the missing right border is closed at the grid's right limit when
/// that lies beyond the last line.
fn grid_boundaries(lines: &[u32], width: u32, layout: &FormLayout) -> Option<Vec<u32>> {
    let needed = ZONE_COUNT + 1;
    if lines.len() >= needed {
        return Some(lines[lines.len() - needed..].to_vec());
    }
    if lines.len() == ZONE_COUNT {
        let closing = (width as f32 * layout.grid_max_x_ratio).round() as u32;
        let last = *lines.last()?;
        if closing > last {
            let mut bounds = lines.to_vec();
            bounds.push(closing);
            return Some(bounds);
        }
    }
    None
}

/// Build the five zones for a row anchored at `anchor`
#[must_use]
pub fn build_zones(
    anchor: &BoundingBox,
    grid_lines: &[u32],
    width: u32,
    layout: &FormLayout,
) -> [Zone; ZONE_COUNT] {
    let (top, height) = row_span(anchor, layout);
    let lines = filter_grid_lines(grid_lines, width, layout);

    let zone = |column: usize, x: u32, w: u32| Zone {
        column,
        rect: BoundingBox::new(x, top, w, height),
    };

    if let Some(bounds) = grid_boundaries(&lines, width, layout) {
        return std::array::from_fn(|i| {
            let (x, w) = inset_span(bounds[i], bounds[i + 1], layout.column_inset);
            zone(i, x, w)
        });
    }

    let start = lines
        .first()
        .map_or_else(|| layout.grid_min_x(width), |&x| x as f32);
    let end = width as f32 * layout.grid_max_x_ratio;
    let column_width = ((end - start) / ZONE_COUNT as f32).max(0.0);
    let inset = column_width * layout.fallback_inset_ratio;

    std::array::from_fn(|i| {
        let left = start + column_width * i as f32 + inset;
        let w = column_width - 2.0 * inset;
        zone(i, left.round().max(0.0) as u32, w.round().max(0.0) as u32)
    })
}

/// Page noise floor: ink fraction of strips along all four page edges
#[must_use]
pub fn margin_baseline(ink: &InkMap, strip: u32) -> f32 {
    let (width, height) = ink.dimensions();
    let strip_w = strip.min(width);
    let strip_h = strip.min(height);
    let strips = [
        BoundingBox::new(0, 0, width, strip_h),
        BoundingBox::new(0, height - strip_h, width, strip_h),
        BoundingBox::new(0, 0, strip_w, height),
        BoundingBox::new(width - strip_w, 0, strip_w, height),
    ];

    let (count, area) = strips.iter().fold((0u64, 0u64), |(count, area), rect| {
        (count + ink.ink_count(*rect), area + rect.area())
    });
    if area == 0 {
        0.0
    } else {
        count as f32 / area as f32
    }
}

/// Accepted column for a row of zone densities, if any.
///
/// `multiplier` relaxes the noise threshold only; the absolute floor and the
/// dominance rule are applied unchanged. Ties resolve to the leftmost zone.
#[must_use]
pub fn decide(
    densities: &[f32; ZONE_COUNT],
    baseline: f32,
    multiplier: f32,
    layout: &FormLayout,
) -> Option<usize> {
    let (winner, max) = densities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, d)| if d > best.1 { (i, d) } else { best });

    let others: f32 = densities
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != winner)
        .map(|(_, d)| d)
        .sum();
    let avg_others = others / (ZONE_COUNT - 1) as f32;

    let noise_threshold =
        (layout.baseline_factor * baseline).max(layout.neighbour_factor * avg_others) * multiplier;

    let accepted = max > noise_threshold
        && max > layout.min_mark_density
        && (avg_others == 0.0 || max > layout.dominance_factor * avg_others);
    accepted.then_some(winner)
}

/// Score one row, relaxing the noise threshold through the layout's retry
/// multipliers until a zone is accepted.
#[must_use]
pub fn score_row(
    ink: &InkMap,
    anchor: &BoundingBox,
    grid_lines: &[u32],
    baseline: f32,
    layout: &FormLayout,
) -> ZoneDecision {
    let multipliers: &[f32] = if layout.retry_multipliers.is_empty() {
        &[1.0]
    } else {
        &layout.retry_multipliers
    };
    let (width, _) = ink.dimensions();

    let mut decision = ZoneDecision {
        column: None,
        densities: [0.0; ZONE_COUNT],
        attempts: 0,
    };
    for &multiplier in multipliers {
        let zones = build_zones(anchor, grid_lines, width, layout);
        decision.densities = zones.map(|z| ink.density(z.rect));
        decision.attempts += 1;
        decision.column = decide(&decision.densities, baseline, multiplier, layout);
        if decision.column.is_some() {
            break;
        }
    }
    decision
}

/// Scores every question of a page against one binarized image
pub struct ZoneScorer<'a> {
    ink: InkMap,
    baseline: f32,
    grid_lines: Vec<u32>,
    layout: &'a FormLayout,
}

impl<'a> ZoneScorer<'a> {
    #[must_use]
    pub fn new(binary: &GrayImage, grid_lines: &[u32], layout: &'a FormLayout) -> Self {
        let ink = InkMap::new(binary);
        let baseline = margin_baseline(&ink, layout.margin_strip_width);
        debug!("Margin baseline density {baseline:.4}");
        Self {
            ink,
            baseline,
            grid_lines: filter_grid_lines(grid_lines, binary.width(), layout),
            layout,
        }
    }

    #[inline]
    #[must_use]
    pub const fn baseline(&self) -> f32 {
        self.baseline
    }

    #[must_use]
    pub fn score(&self, anchor: &AnchorBox) -> ZoneDecision {
        score_row(
            &self.ink,
            &anchor.bbox,
            &self.grid_lines,
            self.baseline,
            self.layout,
        )
    }

    /// One result per rubric question, in order. Questions without an anchor
    /// are unscored.
    #[must_use]
    pub fn score_all(&self, anchors: &BTreeMap<QuestionId, AnchorBox>) -> Vec<ScoreResult> {
        QUESTION_IDS
            .map(|question| {
                let Some(anchor) = anchors.get(&question) else {
                    debug!("Q{question}: no anchor, unscored");
                    return ScoreResult::new(question, None);
                };
                let decision = self.score(anchor);
                debug!(
                    "Q{question}: column {:?} after {} attempt(s), densities {:?}",
                    decision.column, decision.attempts, decision.densities
                );
                ScoreResult::new(question, decision.score())
            })
            .collect()
    }
}
