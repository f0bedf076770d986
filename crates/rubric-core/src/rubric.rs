//! Rubric table
//!
//! The grading sheet has eleven criteria, each scored on the {0,2,3,4,5}
//! scale. Descriptions are "<criterion>: <level descriptor>".

use crate::types::{QuestionId, Score};
use once_cell::sync::Lazy;
use std::ops::RangeInclusive;

/// Number of scored questions on a rubric page
pub const QUESTION_COUNT: usize = 11;

/// Valid question ids
pub const QUESTION_IDS: RangeInclusive<QuestionId> = 1..=11;

/// Phrases printed on every rubric page, used to tell rubric pages apart
/// from free-text comment pages in the same document. Each is specific to the
/// printed form; bare words like "group" or "score" also turn up in comments.
pub const RUBRIC_KEYWORDS: [&str; 5] = [
    "EVALUATION RUBRIC",
    "CRITERIA",
    "ADVISOR:",
    "GROUP:",
    "TOTAL SCORE",
];

const CRITERIA: [&str; QUESTION_COUNT] = [
    "Problem definition",
    "Background research",
    "Requirements and constraints",
    "Design alternatives",
    "Technical analysis",
    "Implementation",
    "Testing and validation",
    "Project management",
    "Teamwork and collaboration",
    "Written report",
    "Oral presentation",
];

/// Level descriptors, indexed like [`crate::SCORE_SCALE`]
const LEVELS: [&str; 5] = [
    "Not evident",
    "Beginning",
    "Developing",
    "Proficient",
    "Exemplary",
];

static DESCRIPTIONS: Lazy<Vec<[String; 5]>> = Lazy::new(|| {
    CRITERIA
        .iter()
        .map(|criterion| LEVELS.map(|level| format!("{criterion}: {level}")))
        .collect()
});

/// Criterion title for a question
#[must_use]
pub fn criterion(question: QuestionId) -> Option<&'static str> {
    usize::from(question)
        .checked_sub(1)
        .and_then(|i| CRITERIA.get(i))
        .copied()
}

/// Level descriptor for a score, independent of question
#[must_use]
pub fn level(score: Score) -> &'static str {
    LEVELS[score.column()]
}

/// Rubric description for a question's score. Unscored questions and unknown
/// ids describe as the empty string.
#[must_use]
pub fn describe(question: QuestionId, score: Option<Score>) -> &'static str {
    let Some(score) = score else {
        return "";
    };
    usize::from(question)
        .checked_sub(1)
        .and_then(|i| DESCRIPTIONS.get(i))
        .map_or("", |row| row[score.column()].as_str())
}

/// Whether `phrase` occurs in `text` on word boundaries. Both sides are
/// already upper-cased with whitespace collapsed.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let starts_word = phrase.starts_with(char::is_alphanumeric);
    let ends_word = phrase.ends_with(char::is_alphanumeric);
    text.match_indices(phrase).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + phrase.len()..].chars().next();
        !(starts_word && before.is_some_and(char::is_alphanumeric))
            && !(ends_word && after.is_some_and(char::is_alphanumeric))
    })
}

fn collapse(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Whether `text` contains any rubric keyword phrase, case-insensitively and
/// on word boundaries ("CRITERIA" does not match "subcriteria")
#[must_use]
pub fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    let text = collapse(text);
    keywords
        .iter()
        .map(|k| collapse(k))
        .any(|k| !k.is_empty() && contains_phrase(&text, &k))
}
