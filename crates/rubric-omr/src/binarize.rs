//! Adaptive thresholding and ink density measurement
//!
//! Two binarizations are used by the pipeline:
//! - [`binarize_inverted`]: local mean threshold, ink = 255. Feeds line
//!   detection, the grid locator and the zone scorer.
//! - [`binarize_for_recognition`]: Gaussian-weighted threshold, black text on
//!   white. Feeds full-page OCR in plain-text mode.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::integral_image;
use rubric_core::BoundingBox;

/// Pixel value for ink in inverted binary images
pub const INK: u8 = 255;

/// Pixel value for background in inverted binary images
pub const BACKGROUND: u8 = 0;

type Integral = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Sum of `integral` over the half-open rectangle `[x0, x1) x [y0, y1)`.
///
/// `integral` has one more row and column than the source image, with a zero
/// first row and column.
#[inline]
fn rect_sum(integral: &Integral, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
    let a = integral.get_pixel(x1, y1)[0];
    let b = integral.get_pixel(x0, y1)[0];
    let c = integral.get_pixel(x1, y0)[0];
    let d = integral.get_pixel(x0, y0)[0];
    (a + d) - (b + c)
}

/// Local mean adaptive threshold with inverted polarity.
///
/// A pixel is ink when it is at or below the mean of its
/// `(2 * block_radius + 1)` square neighbourhood minus `offset`. The
/// neighbourhood is clipped at the image border.
#[must_use]
pub fn binarize_inverted(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let integral: Integral = integral_image::<_, u64>(gray);
    let offset = i64::from(offset);

    for y in 0..height {
        let y0 = y.saturating_sub(block_radius);
        let y1 = (y + block_radius + 1).min(height);
        for x in 0..width {
            let x0 = x.saturating_sub(block_radius);
            let x1 = (x + block_radius + 1).min(width);

            let count = i64::from((x1 - x0) * (y1 - y0));
            let sum = rect_sum(&integral, x0, y0, x1, y1) as i64;
            let value = i64::from(gray.get_pixel(x, y)[0]);

            // value <= sum / count - offset, kept in integers
            if value * count <= sum - offset * count {
                out.put_pixel(x, y, Luma([INK]));
            }
        }
    }
    out
}

/// Gaussian-weighted adaptive threshold producing black text on white.
///
/// `block_size` follows the usual odd window convention; the Gaussian sigma is
/// derived from it the same way common imaging libraries do
/// (`0.3 * ((block_size - 1) / 2 - 1) + 0.8`).
#[must_use]
pub fn binarize_for_recognition(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let sigma = 0.3 * ((block_size.max(3) as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let blurred = gaussian_blur_f32(gray, sigma);

    let mut out = GrayImage::from_pixel(gray.width(), gray.height(), Luma([255]));
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = f32::from(blurred.get_pixel(x, y)[0]) - offset;
        if f32::from(pixel[0]) <= threshold {
            out.put_pixel(x, y, Luma([0]));
        }
    }
    out
}

/// Constant-time ink counts over rectangles of an inverted binary image
pub struct InkMap {
    integral: Integral,
    width: u32,
    height: u32,
}

impl InkMap {
    #[must_use]
    pub fn new(binary: &GrayImage) -> Self {
        Self {
            integral: integral_image::<_, u64>(binary),
            width: binary.width(),
            height: binary.height(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of ink pixels inside `rect`, clamped to the image
    #[must_use]
    pub fn ink_count(&self, rect: BoundingBox) -> u64 {
        let r = rect.clamp_to(self.width, self.height);
        if r.is_empty() {
            return 0;
        }
        rect_sum(&self.integral, r.x, r.y, r.right(), r.bottom()) / u64::from(INK)
    }

    /// Ink fraction of `rect` after clamping; 0 for degenerate or
    /// out-of-bounds rectangles
    #[must_use]
    pub fn density(&self, rect: BoundingBox) -> f32 {
        let r = rect.clamp_to(self.width, self.height);
        if r.is_empty() {
            return 0.0;
        }
        self.ink_count(r) as f32 / r.area() as f32
    }
}
