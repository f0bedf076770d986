//! Rubric page validation
//!
//! Documents mix rubric sheets with free-text comment pages. A quick OCR pass
//! over a downscaled copy looks for any of the printed rubric phrases; pages
//! without one are rejected before any scoring work is done.

use image::{imageops, GrayImage};
use rubric_core::{rubric, FormLayout, LayoutMode, Outcome, Recognizer};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Rubric,
    NonRubric,
}

/// Copy of `image` scaled by `scale` (clamped to at least 1x1)
fn downscale(image: &GrayImage, scale: f32) -> GrayImage {
    if scale <= 0.0 || scale >= 1.0 {
        return image.clone();
    }
    let width = ((image.width() as f32 * scale).round() as u32).max(1);
    let height = ((image.height() as f32 * scale).round() as u32).max(1);
    imageops::resize(image, width, height, imageops::FilterType::Triangle)
}

/// Classify the page. A recognizer failure classifies it as non-rubric and
/// is reported as degraded.
pub fn validate_page(
    image: &GrayImage,
    recognizer: &dyn Recognizer,
    layout: &FormLayout,
) -> Outcome<PageKind> {
    let small = downscale(image, layout.validation_scale);
    match recognizer.recognize_text(&small, LayoutMode::SingleBlock) {
        Ok(text) if rubric::contains_keyword(&text, &layout.keywords) => {
            Outcome::Resolved(PageKind::Rubric)
        }
        Ok(text) => {
            debug!("No rubric keyword in {} chars of page text", text.len());
            Outcome::Resolved(PageKind::NonRubric)
        }
        Err(e) => {
            warn!("Validation OCR failed, treating page as comments: {e}");
            Outcome::degraded(PageKind::NonRubric, format!("validation OCR failed: {e}"))
        }
    }
}
