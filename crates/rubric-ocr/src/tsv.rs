//! Parser for Tesseract's `tsv` output

use rubric_core::{BoundingBox, RecognizerError, Word};
use serde::Deserialize;

/// Row level of individual words
const WORD_LEVEL: u8 = 5;

#[derive(Debug, Deserialize)]
struct Row {
    level: u8,
    left: u32,
    top: u32,
    width: u32,
    height: u32,
    conf: f32,
    #[serde(default)]
    text: Option<String>,
}

/// Words from a Tesseract TSV report.
///
/// Only word-level rows with text and a non-negative confidence are kept.
pub fn parse_words(tsv: &str) -> Result<Vec<Word>, RecognizerError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(tsv.as_bytes());

    let mut words = Vec::new();
    for row in reader.deserialize::<Row>() {
        let row = row.map_err(|e| RecognizerError::Parse(format!("tsv: {e}")))?;
        if row.level != WORD_LEVEL || row.conf < 0.0 {
            continue;
        }
        let Some(text) = row.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
            continue;
        };
        words.push(Word::new(
            text,
            BoundingBox::new(row.left, row.top, row.width, row.height),
            row.conf,
        ));
    }
    Ok(words)
}
