//! Handwritten field extraction
//!
//! A field is the handwriting to the right of a printed label ("Advisor",
//! "Group"). The crop is what a reviewer relies on; the transcription is a
//! best-effort guess that is often empty for cursive.

use crate::artifacts::ArtifactDir;
use image::{imageops, GrayImage};
use rubric_core::{
    BoundingBox, FieldExtraction, FieldSpec, FormLayout, LayoutMode, Outcome, PageRef, Recognizer,
    Result, Word,
};
use tracing::{debug, warn};

/// First confident word containing `label`, case-insensitively
#[must_use]
pub fn find_label<'w>(words: &'w [Word], label: &str, min_confidence: f32) -> Option<&'w Word> {
    let needle = label.to_lowercase();
    words
        .iter()
        .find(|w| w.confidence > min_confidence && w.text.to_lowercase().contains(&needle))
}

/// Crop region for a field whose label sits at `label`: right of the label,
/// extended downwards for sloped handwriting, clamped to the page
#[must_use]
pub fn field_region(label: &BoundingBox, spec: &FieldSpec, width: u32, height: u32) -> BoundingBox {
    BoundingBox::new(
        label.right().saturating_add(spec.gap),
        label.y,
        spec.width,
        label.height.saturating_add(spec.extra_height),
    )
    .clamp_to(width, height)
}

/// Strip the punctuation noise recognizers emit on cursive strokes, keeping
/// letters, digits and single spaces
#[must_use]
pub fn clean_field_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| token.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Locate `spec.label` among `words`, save the crop and try to read it.
///
/// A missing label or a failed transcription is a degraded outcome, never an
/// error. Only failing to write the crop is.
pub fn extract_field(
    cleaned: &GrayImage,
    words: &[Word],
    spec: &FieldSpec,
    recognizer: &dyn Recognizer,
    artifacts: &ArtifactDir,
    page: &PageRef,
    layout: &FormLayout,
) -> Result<Outcome<FieldExtraction>> {
    let Some(label) = find_label(words, &spec.label, layout.min_word_confidence) else {
        debug!("Field '{}' not found on {:?}", spec.label, page);
        return Ok(Outcome::degraded(
            FieldExtraction::absent(&spec.label),
            "label not found",
        ));
    };

    let region = field_region(&label.bbox, spec, cleaned.width(), cleaned.height());
    if region.is_empty() {
        return Ok(Outcome::degraded(
            FieldExtraction::absent(&spec.label),
            "label at page edge, no room for a field",
        ));
    }

    let crop = imageops::crop_imm(cleaned, region.x, region.y, region.width, region.height)
        .to_image();
    let name = format!(
        "{}_{}",
        page.artifact_stem(),
        spec.label.to_lowercase().replace(char::is_whitespace, "_")
    );
    let crop_path = artifacts.save_png(&name, &crop)?;

    let outcome = match recognizer.recognize_text(&crop, LayoutMode::SingleLine) {
        Ok(raw) => Outcome::Resolved(FieldExtraction {
            label: spec.label.clone(),
            text: clean_field_text(&raw),
            crop_path: Some(crop_path),
        }),
        Err(e) => {
            warn!("Reading field '{}' failed: {e}", spec.label);
            Outcome::degraded(
                FieldExtraction {
                    label: spec.label.clone(),
                    text: String::new(),
                    crop_path: Some(crop_path),
                },
                format!("field recognition failed: {e}"),
            )
        }
    };
    Ok(outcome)
}
