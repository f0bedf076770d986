//! Page data model
//!
//! Every value here is created and consumed while one page is processed.
//! Nothing is shared between pages or documents.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rubric question number (1-based)
pub type QuestionId = u8;

/// Score values in column order, left to right on the answer grid
pub const SCORE_SCALE: [u8; 5] = [0, 2, 3, 4, 5];

/// A score on the rubric scale {0, 2, 3, 4, 5}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Score for an answer column index (0..5)
    #[must_use]
    pub fn from_column(column: usize) -> Option<Self> {
        SCORE_SCALE.get(column).copied().map(Self)
    }

    /// Score for a raw value, if it is on the scale
    #[must_use]
    pub fn from_value(value: u8) -> Option<Self> {
        SCORE_SCALE.contains(&value).then_some(Self(value))
    }

    #[inline]
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Answer column index this score is printed in
    #[must_use]
    pub fn column(self) -> usize {
        SCORE_SCALE
            .iter()
            .position(|&v| v == self.0)
            .unwrap_or_default()
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| format!("{value} is not on the rubric scale"))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    #[inline]
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp to an image of the given size. Returns an empty box when the
    /// rectangle lies entirely outside.
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);
        Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// Location of a question's printed number label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorBox {
    pub question: QuestionId,
    pub bbox: BoundingBox,
}

/// Score decision for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub question: QuestionId,
    /// `None` when no zone could be confidently resolved
    pub score: Option<Score>,
    /// Rubric descriptor for the score, empty when unscored
    pub description: String,
}

impl ScoreResult {
    #[must_use]
    pub fn new(question: QuestionId, score: Option<Score>) -> Self {
        Self {
            question,
            score,
            description: crate::rubric::describe(question, score).to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_scored(&self) -> bool {
        self.score.is_some()
    }
}

/// A handwritten field located by its printed label
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldExtraction {
    pub label: String,
    /// Best-effort transcription, frequently empty
    pub text: String,
    /// Saved crop, relative to the artifact root. `None` when the label was not found.
    pub crop_path: Option<PathBuf>,
}

impl FieldExtraction {
    /// Result for a label that was not found on the page
    #[must_use]
    pub fn absent(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }
}

/// Identifies one page of one document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub filename: String,
    /// 1-based position of the document in its batch
    #[serde(default = "first_document")]
    pub document: usize,
    /// 1-based page number
    pub page_num: usize,
}

fn first_document() -> usize {
    1
}

impl PageRef {
    /// Page `page_num` of the first (or only) document
    #[must_use]
    pub fn new(filename: impl Into<String>, page_num: usize) -> Self {
        Self {
            filename: filename.into(),
            document: first_document(),
            page_num,
        }
    }

    /// Place the page in document `document` of a batch
    #[must_use]
    pub fn in_document(mut self, document: usize) -> Self {
        self.document = document;
        self
    }

    /// File-system friendly stem used to name artifacts for this page.
    ///
    /// The document index keeps stems apart for files whose names sanitize
    /// to the same string ("team A.pdf" and "team_A.pdf") or that share a
    /// name in different directories.
    #[must_use]
    pub fn artifact_stem(&self) -> String {
        let stem = std::path::Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone());
        let safe: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{safe}_d{}_p{}", self.document, self.page_num)
    }
}

/// Fully scored rubric page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredPage {
    /// One entry per rubric question, in question order
    pub scores: Vec<ScoreResult>,
    pub advisor: FieldExtraction,
    pub group: FieldExtraction,
    /// Sum of resolved scores; unscored questions contribute 0
    pub total: u32,
}

impl ScoredPage {
    #[must_use]
    pub fn new(scores: Vec<ScoreResult>, advisor: FieldExtraction, group: FieldExtraction) -> Self {
        let total = scores
            .iter()
            .filter_map(|s| s.score)
            .map(|s| u32::from(s.value()))
            .sum();
        Self {
            scores,
            advisor,
            group,
            total,
        }
    }

    /// Questions the scorer could not resolve
    #[must_use]
    pub fn unscored(&self) -> Vec<QuestionId> {
        self.scores
            .iter()
            .filter(|s| !s.is_scored())
            .map(|s| s.question)
            .collect()
    }
}

/// Terminal state of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PageOutcome {
    Scored(ScoredPage),
    /// Not a rubric page; the whole page was saved as a comments image
    Rejected {
        comments_image: PathBuf,
        reason: String,
    },
}

/// Result record for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub page: PageRef,
    pub outcome: PageOutcome,
}

impl PageResult {
    #[must_use]
    pub fn scored(&self) -> Option<&ScoredPage> {
        match &self.outcome {
            PageOutcome::Scored(page) => Some(page),
            PageOutcome::Rejected { .. } => None,
        }
    }

    #[must_use]
    pub fn comments_image(&self) -> Option<&PathBuf> {
        match &self.outcome {
            PageOutcome::Scored(_) => None,
            PageOutcome::Rejected { comments_image, .. } => Some(comments_image),
        }
    }
}
