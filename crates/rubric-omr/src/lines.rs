//! Ruled-line detection and removal
//!
//! A ruled line is a straight run of ink at least `line_kernel_length` pixels
//! long. Keeping exactly the pixels that belong to such runs is the same as a
//! binary opening with a 1-pixel-thick line element of that length, which is
//! how the table borders are isolated here.

use crate::binarize::{binarize_inverted, BACKGROUND, INK};
use image::{GrayImage, Luma};
use rubric_core::FormLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDirection {
    Horizontal,
    Vertical,
}

/// Mask of the ink pixels that lie on a run of at least `min_len` pixels in
/// `direction`. Input and output use inverted polarity (ink = 255).
#[must_use]
pub fn long_runs(binary: &GrayImage, direction: RunDirection, min_len: u32) -> GrayImage {
    let (width, height) = binary.dimensions();
    let mut mask = GrayImage::new(width, height);
    let min_len = min_len.max(1);

    let (outer, inner) = match direction {
        RunDirection::Horizontal => (height, width),
        RunDirection::Vertical => (width, height),
    };
    let coords = |line: u32, pos: u32| match direction {
        RunDirection::Horizontal => (pos, line),
        RunDirection::Vertical => (line, pos),
    };

    for line in 0..outer {
        let mut start = 0;
        let mut len = 0;
        // one extra step flushes a run that touches the border
        for pos in 0..=inner {
            let is_ink = pos < inner && {
                let (x, y) = coords(line, pos);
                binary.get_pixel(x, y)[0] != BACKGROUND
            };
            if is_ink {
                if len == 0 {
                    start = pos;
                }
                len += 1;
                continue;
            }
            if len >= min_len {
                for p in start..start + len {
                    let (x, y) = coords(line, p);
                    mask.put_pixel(x, y, Luma([INK]));
                }
            }
            len = 0;
        }
    }
    mask
}

/// Erase ruled table borders from `gray`.
///
/// Long horizontal and vertical runs found in the binarized page are painted
/// white on a copy of `gray`; glyphs and handwriting survive because they do
/// not form long straight runs.
#[must_use]
pub fn strip_lines(gray: &GrayImage, layout: &FormLayout) -> GrayImage {
    let binary = binarize_inverted(gray, layout.threshold_block_radius, layout.threshold_offset);
    erase_lines(gray, &binary, layout)
}

/// [`strip_lines`] with an inverted binarization of `gray` already at hand
#[must_use]
pub fn erase_lines(gray: &GrayImage, binary: &GrayImage, layout: &FormLayout) -> GrayImage {
    let horizontal = long_runs(binary, RunDirection::Horizontal, layout.line_kernel_length);
    let vertical = long_runs(binary, RunDirection::Vertical, layout.line_kernel_length);

    let mut cleaned = gray.clone();
    for (x, y, pixel) in cleaned.enumerate_pixels_mut() {
        let lines = horizontal.get_pixel(x, y)[0].max(vertical.get_pixel(x, y)[0]);
        pixel[0] = pixel[0].saturating_add(lines);
    }
    cleaned
}
