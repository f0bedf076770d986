//! Tesseract recognizers
//!
//! Two implementations of [`rubric_core::Recognizer`]:
//! - [`TesseractCli`]: runs the `tesseract` executable per call. Default.
//! - `EmbeddedTesseract` (feature `embedded`): links libtesseract through
//!   `leptess`. Has no orientation detection.

pub mod cli;
#[cfg(feature = "embedded")]
pub mod embedded;
pub mod osd;
pub mod tsv;

pub use cli::TesseractCli;
#[cfg(feature = "embedded")]
pub use embedded::EmbeddedTesseract;
pub use osd::parse_osd;
pub use tsv::parse_words;

use rubric_core::LayoutMode;

/// Tesseract page segmentation mode for a layout hint
#[must_use]
pub const fn page_segmentation_mode(mode: LayoutMode) -> u8 {
    match mode {
        LayoutMode::Orientation => 0,
        LayoutMode::SingleColumn => 4,
        LayoutMode::SingleBlock => 6,
        LayoutMode::SingleLine => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psm_mapping() {
        assert_eq!(page_segmentation_mode(LayoutMode::SingleBlock), 6);
        assert_eq!(page_segmentation_mode(LayoutMode::SingleColumn), 4);
        assert_eq!(page_segmentation_mode(LayoutMode::SingleLine), 7);
        assert_eq!(page_segmentation_mode(LayoutMode::Orientation), 0);
    }
}
