//! Fixed structural priors of the rubric form
//!
//! The pipeline does not discover the table layout. These values describe the
//! printed sheet and can be retuned per form through the `[layout]` config
//! section without touching algorithm code.

use crate::rubric::RUBRIC_KEYWORDS;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Page geometry
// ============================================================================

/// Grid lines left of this fraction of the page width belong to the question text column
pub const GRID_MIN_X_RATIO: f32 = 0.45;

/// Right limit of the answer grid when it has to be subdivided evenly
pub const GRID_MAX_X_RATIO: f32 = 0.95;

/// Question number labels are printed left of this fraction of the page width
pub const ANCHOR_MAX_X_RATIO: f32 = 0.15;

/// Minimum recognizer confidence (0-100) for label and anchor tokens
pub const MIN_WORD_CONFIDENCE: f32 = 60.0;

/// Maximum skew (degrees) the normalizer will correct
pub const MAX_SKEW_DEGREES: f32 = 15.0;

// ============================================================================
// Line detection
// ============================================================================

/// Minimum run length (pixels) for a stroke to count as a ruled line
pub const LINE_KERNEL_LENGTH: u32 = 40;

/// Column-profile peaks below this fraction of the maximum are ignored
pub const COLUMN_PEAK_RATIO: f32 = 0.30;

/// Column detections closer than this (pixels) merge into one grid line
pub const LINE_MERGE_DISTANCE: u32 = 15;

// ============================================================================
// Zone scoring
// ============================================================================

/// Row span extension above the anchor box
pub const ROW_PAD_ABOVE: u32 = 10;

/// Row span extension below the anchor box
pub const ROW_PAD_BELOW: u32 = 20;

/// Inset (pixels) applied to grid-derived columns so border strokes are not counted
pub const COLUMN_INSET: u32 = 5;

/// Inset applied to each side of evenly subdivided columns, as a fraction of column width
pub const FALLBACK_INSET_RATIO: f32 = 0.25;

/// Width of the page-edge strips sampled for the noise floor
pub const MARGIN_STRIP_WIDTH: u32 = 50;

/// Absolute density floor below which no zone counts as marked
pub const MIN_MARK_DENSITY: f32 = 0.015;

/// noise_threshold uses this multiple of the margin baseline
pub const BASELINE_FACTOR: f32 = 2.0;

/// noise_threshold uses this multiple of the average of the other zones
pub const NEIGHBOUR_FACTOR: f32 = 1.5;

/// The winning zone must exceed the average of the others by this factor
pub const DOMINANCE_FACTOR: f32 = 2.0;

/// Confidence multipliers tried in order; the scorer gives up after the last
pub const RETRY_MULTIPLIERS: [f32; 2] = [1.0, 0.5];

// ============================================================================
// Binarization
// ============================================================================

/// Neighbourhood radius for adaptive thresholding (block = 2r + 1)
pub const THRESHOLD_BLOCK_RADIUS: u32 = 7;

/// A pixel is ink when darker than its neighbourhood mean by more than this
pub const THRESHOLD_OFFSET: i32 = 10;

/// Scale applied to the page before the validation OCR pass
pub const VALIDATION_SCALE: f32 = 0.5;

// ============================================================================
// Handwritten fields
// ============================================================================

pub const ADVISOR_LABEL: &str = "Advisor";

pub const GROUP_LABEL: &str = "Group";

/// A handwritten field located right of its printed label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Printed label text, matched case-insensitively
    pub label: String,
    /// Gap between the label's right edge and the crop
    pub gap: u32,
    /// Width of the crop
    pub width: u32,
    /// Extra height below the label to allow for sloped handwriting
    pub extra_height: u32,
}

impl FieldSpec {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            gap: 5,
            width: 700,
            extra_height: 40,
        }
    }
}

/// A `[layout.*_field]` table; keys left out keep the field's defaults
#[derive(Deserialize)]
struct FieldOverrides {
    label: Option<String>,
    gap: Option<u32>,
    width: Option<u32>,
    extra_height: Option<u32>,
}

impl FieldOverrides {
    fn apply(self, mut spec: FieldSpec) -> FieldSpec {
        if let Some(label) = self.label {
            spec.label = label;
        }
        spec.gap = self.gap.unwrap_or(spec.gap);
        spec.width = self.width.unwrap_or(spec.width);
        spec.extra_height = self.extra_height.unwrap_or(spec.extra_height);
        spec
    }
}

fn advisor_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FieldSpec, D::Error> {
    FieldOverrides::deserialize(deserializer).map(|o| o.apply(FieldSpec::new(ADVISOR_LABEL)))
}

fn group_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FieldSpec, D::Error> {
    FieldOverrides::deserialize(deserializer).map(|o| o.apply(FieldSpec::new(GROUP_LABEL)))
}

/// Structural priors for one form layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLayout {
    pub grid_min_x_ratio: f32,
    pub grid_max_x_ratio: f32,
    pub anchor_max_x_ratio: f32,
    pub min_word_confidence: f32,
    pub max_skew_degrees: f32,
    pub line_kernel_length: u32,
    pub column_peak_ratio: f32,
    pub line_merge_distance: u32,
    pub row_pad_above: u32,
    pub row_pad_below: u32,
    pub column_inset: u32,
    pub fallback_inset_ratio: f32,
    pub margin_strip_width: u32,
    pub min_mark_density: f32,
    pub baseline_factor: f32,
    pub neighbour_factor: f32,
    pub dominance_factor: f32,
    pub retry_multipliers: Vec<f32>,
    pub threshold_block_radius: u32,
    pub threshold_offset: i32,
    pub validation_scale: f32,
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "advisor_field")]
    pub advisor_field: FieldSpec,
    #[serde(deserialize_with = "group_field")]
    pub group_field: FieldSpec,
}

impl Default for FormLayout {
    fn default() -> Self {
        Self {
            grid_min_x_ratio: GRID_MIN_X_RATIO,
            grid_max_x_ratio: GRID_MAX_X_RATIO,
            anchor_max_x_ratio: ANCHOR_MAX_X_RATIO,
            min_word_confidence: MIN_WORD_CONFIDENCE,
            max_skew_degrees: MAX_SKEW_DEGREES,
            line_kernel_length: LINE_KERNEL_LENGTH,
            column_peak_ratio: COLUMN_PEAK_RATIO,
            line_merge_distance: LINE_MERGE_DISTANCE,
            row_pad_above: ROW_PAD_ABOVE,
            row_pad_below: ROW_PAD_BELOW,
            column_inset: COLUMN_INSET,
            fallback_inset_ratio: FALLBACK_INSET_RATIO,
            margin_strip_width: MARGIN_STRIP_WIDTH,
            min_mark_density: MIN_MARK_DENSITY,
            baseline_factor: BASELINE_FACTOR,
            neighbour_factor: NEIGHBOUR_FACTOR,
            dominance_factor: DOMINANCE_FACTOR,
            retry_multipliers: RETRY_MULTIPLIERS.to_vec(),
            threshold_block_radius: THRESHOLD_BLOCK_RADIUS,
            threshold_offset: THRESHOLD_OFFSET,
            validation_scale: VALIDATION_SCALE,
            keywords: RUBRIC_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            advisor_field: FieldSpec::new(ADVISOR_LABEL),
            group_field: FieldSpec::new(GROUP_LABEL),
        }
    }
}

impl FormLayout {
    /// Smallest x a grid line may have on a page of this width
    #[inline]
    #[must_use]
    pub fn grid_min_x(&self, width: u32) -> f32 {
        width as f32 * self.grid_min_x_ratio
    }

    /// Largest x an anchor may have on a page of this width
    #[inline]
    #[must_use]
    pub fn anchor_max_x(&self, width: u32) -> f32 {
        width as f32 * self.anchor_max_x_ratio
    }
}
