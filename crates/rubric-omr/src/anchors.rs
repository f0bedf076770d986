//! Question anchor localization
//!
//! Each rubric row starts with its printed number ("1.", "10 ") in the far
//! left margin. The anchor for a question is the first confident token in
//! that margin whose leading digits name a known question.

use once_cell::sync::Lazy;
use regex::Regex;
use rubric_core::{
    AnchorBox, FormLayout, LayoutMode, QuestionId, Recognizer, RecognizerError, Word, QUESTION_IDS,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One or two leading digits followed by a period or whitespace
static ANCHOR_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[.\s]").expect("Invalid anchor label regex"));

/// Question id named by an anchor token, if the token looks like one.
///
/// A trailing space is appended before matching because word-level tokens
/// never carry the whitespace that separates them from the next word.
#[must_use]
pub fn parse_anchor_label(text: &str) -> Option<QuestionId> {
    let token = format!("{} ", text.trim());
    let digits = ANCHOR_LABEL.captures(&token)?.get(1)?.as_str();
    let id: QuestionId = digits.parse().ok()?;
    QUESTION_IDS.contains(&id).then_some(id)
}

/// Pick anchors from recognized words.
///
/// A token is accepted when it parses as a known question id, its confidence
/// exceeds the layout minimum, and it starts inside the left margin. The first
/// accepted token per question wins.
#[must_use]
pub fn select_anchors(
    words: &[Word],
    width: u32,
    layout: &FormLayout,
) -> BTreeMap<QuestionId, AnchorBox> {
    let max_x = layout.anchor_max_x(width);
    let mut anchors = BTreeMap::new();

    for word in words {
        let Some(question) = parse_anchor_label(&word.text) else {
            continue;
        };
        if word.confidence <= layout.min_word_confidence || word.bbox.x as f32 >= max_x {
            continue;
        }
        anchors.entry(question).or_insert(AnchorBox {
            question,
            bbox: word.bbox,
        });
    }
    anchors
}

/// Recognize the cleaned page in row layout and select anchors.
///
/// Returns the words alongside the anchors so later stages can reuse them.
pub fn locate_anchors(
    cleaned: &image::GrayImage,
    recognizer: &dyn Recognizer,
    layout: &FormLayout,
) -> Result<(BTreeMap<QuestionId, AnchorBox>, Vec<Word>), RecognizerError> {
    let words = recognizer.recognize_words(cleaned, LayoutMode::SingleColumn)?;
    let anchors = select_anchors(&words, cleaned.width(), layout);
    if anchors.len() < QUESTION_IDS.count() {
        let missing: Vec<QuestionId> = QUESTION_IDS.filter(|q| !anchors.contains_key(q)).collect();
        warn!("Anchors missing for questions {:?}", missing);
    }
    debug!("Located {} anchors from {} words", anchors.len(), words.len());
    Ok((anchors, words))
}
