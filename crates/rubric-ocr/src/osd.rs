//! Parser for Tesseract's orientation and script detection report

use once_cell::sync::Lazy;
use regex::Regex;
use rubric_core::{Orientation, RecognizerError};

static ROTATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Rotate:\s*(-?\d+(?:\.\d+)?)").expect("Invalid rotate regex"));

static CONFIDENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Orientation confidence:\s*(-?\d+(?:\.\d+)?)")
        .expect("Invalid orientation confidence regex")
});

fn capture_number(re: &Regex, report: &str) -> Option<f32> {
    re.captures(report)?.get(1)?.as_str().parse().ok()
}

/// Orientation from an OSD report.
///
/// `Rotate` is the clockwise rotation that straightens the page. A report
/// without it is a parse error; a missing confidence reads as 0.
pub fn parse_osd(report: &str) -> Result<Orientation, RecognizerError> {
    let rotate_degrees = capture_number(&ROTATE, report)
        .ok_or_else(|| RecognizerError::Parse("OSD report has no Rotate line".to_string()))?;
    Ok(Orientation {
        rotate_degrees,
        confidence: capture_number(&CONFIDENCE, report).unwrap_or(0.0),
    })
}
