//! Geometric normalization
//!
//! Straightens small rotational skew using the recognizer's orientation
//! report. Normalization is best-effort: any recognizer failure leaves the
//! page untouched and is reported as a degraded outcome.

use image::{imageops, GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rubric_core::{FormLayout, Outcome, Recognizer};
use tracing::{debug, warn};

/// Paper colour used for canvas added by rotation
const BACKGROUND: Luma<u8> = Luma([255]);

/// A page after normalization
#[derive(Debug, Clone)]
pub struct Normalized {
    pub image: GrayImage,
    /// Clockwise rotation (degrees) that was applied, if any
    pub rotation: Option<f32>,
}

impl Normalized {
    fn unchanged(image: GrayImage) -> Self {
        Self {
            image,
            rotation: None,
        }
    }
}

/// Correct the page skew reported by `recognizer`.
///
/// The page is rotated only when the reported angle is nonzero and its
/// magnitude is below the layout's skew ceiling. Otherwise the input buffer
/// is returned as is.
pub fn normalize(
    image: GrayImage,
    recognizer: &dyn Recognizer,
    layout: &FormLayout,
) -> Outcome<Normalized> {
    correct_orientation(image, recognizer, layout.max_skew_degrees)
}

/// Rotate by the recognizer's reported angle when its magnitude is below
/// `max_degrees`. Plain-text extraction passes a full turn so upside-down
/// and sideways scans are corrected too.
pub fn correct_orientation(
    image: GrayImage,
    recognizer: &dyn Recognizer,
    max_degrees: f32,
) -> Outcome<Normalized> {
    let orientation = match recognizer.detect_orientation(&image) {
        Ok(orientation) => orientation,
        Err(e) => {
            warn!("Orientation detection failed, keeping page as is: {e}");
            return Outcome::degraded(
                Normalized::unchanged(image),
                format!("orientation detection failed: {e}"),
            );
        }
    };

    let angle = orientation.rotate_degrees;
    if angle == 0.0 || !angle.is_finite() || angle.abs() >= max_degrees {
        debug!("No skew correction (reported {angle} degrees)");
        return Outcome::Resolved(Normalized::unchanged(image));
    }

    debug!(
        "Rotating page {angle} degrees clockwise (confidence {:.2})",
        orientation.confidence
    );
    Outcome::Resolved(Normalized {
        image: rotate_expand(&image, angle),
        rotation: Some(angle),
    })
}

/// Rotate clockwise by `degrees`, enlarging the canvas so no content is cut
/// off. New canvas is filled with white.
#[must_use]
pub fn rotate_expand(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());

    let new_width = ((width as f32 * cos + height as f32 * sin).ceil() as u32).max(width);
    let new_height = ((width as f32 * sin + height as f32 * cos).ceil() as u32).max(height);

    let mut canvas = GrayImage::from_pixel(new_width, new_height, BACKGROUND);
    let dx = i64::from((new_width - width) / 2);
    let dy = i64::from((new_height - height) / 2);
    imageops::overlay(&mut canvas, image, dx, dy);

    rotate_about_center(&canvas, theta, Interpolation::Bilinear, BACKGROUND)
}
