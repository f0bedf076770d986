//! Seams to the external tools
//!
//! The pipeline never talks to Tesseract or poppler directly. It is handed a
//! [`Recognizer`] and a [`Rasterizer`], which keeps every stage testable with
//! fakes and makes the dependency on external binaries explicit.

use crate::error::{RasterizeError, RecognizerError};
use crate::types::BoundingBox;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// Page layout hint passed to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One uniform block of text
    SingleBlock,
    /// One column of text of variable sizes (table rows)
    SingleColumn,
    /// One text line
    SingleLine,
    /// Orientation and script detection only
    Orientation,
}

/// A recognized word with its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    /// Pixel box in the coordinates of the image that was recognized
    pub bbox: BoundingBox,
    /// Recognition confidence, 0-100
    pub confidence: f32,
}

impl Word {
    #[must_use]
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }
}

/// Orientation report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Clockwise rotation (degrees) that would straighten the page
    pub rotate_degrees: f32,
    pub confidence: f32,
}

/// Printed-text recognizer
///
/// Calls are blocking and may be issued from several worker threads at once.
pub trait Recognizer: Send + Sync {
    /// Plain text of the whole image
    fn recognize_text(&self, image: &GrayImage, mode: LayoutMode)
        -> Result<String, RecognizerError>;

    /// Word-level tokens with boxes and confidences
    fn recognize_words(
        &self,
        image: &GrayImage,
        mode: LayoutMode,
    ) -> Result<Vec<Word>, RecognizerError>;

    /// Orientation report for the image
    fn detect_orientation(&self, image: &GrayImage) -> Result<Orientation, RecognizerError>;
}

/// PDF to page image renderer
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf` at `dpi`, in page order
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, RasterizeError>;
}
