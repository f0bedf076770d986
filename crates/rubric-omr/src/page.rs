//! Per-page orchestration
//!
//! ```text
//! Received -> Normalized -> Validated -> Scored -> Done
//!                       \-> Rejected
//! ```
//!
//! `Rejected` and `Done` are terminal. A rejected page is saved whole as a
//! comments image and produces no scores.

use crate::anchors::locate_anchors;
use crate::artifacts::{ArtifactDir, WriteGate};
use crate::binarize::binarize_inverted;
use crate::deskew::normalize;
use crate::fields::extract_field;
use crate::grid::grid_lines_from_binary;
use crate::lines::erase_lines;
use crate::scorer::ZoneScorer;
use crate::validate::{validate_page, PageKind};
use image::{DynamicImage, GrayImage};
use rubric_core::{
    ExtractError, FieldExtraction, FieldSpec, FormLayout, PageOutcome, PageRef, PageResult,
    Recognizer, Result, ScoredPage, Word,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Received,
    Normalized,
    Validated,
    Rejected,
    Scored,
    Done,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "RECEIVED",
            Self::Normalized => "NORMALIZED",
            Self::Validated => "VALIDATED",
            Self::Rejected => "REJECTED",
            Self::Scored => "SCORED",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

fn enter(page: &PageRef, state: PageState) {
    debug!("{} page {}: {state}", page.filename, page.page_num);
}

/// Runs every stage for one page. Cheap to clone; clones share the
/// recognizer and layout.
#[derive(Clone)]
pub struct PagePipeline {
    recognizer: Arc<dyn Recognizer>,
    layout: Arc<FormLayout>,
    artifacts: ArtifactDir,
    debug_images: bool,
}

impl PagePipeline {
    #[must_use]
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        layout: Arc<FormLayout>,
        artifacts: ArtifactDir,
    ) -> Self {
        Self {
            recognizer,
            layout,
            artifacts,
            debug_images: false,
        }
    }

    /// Also save the binarized and line-stripped copy of every scored page
    #[must_use]
    pub fn with_debug_images(mut self, enabled: bool) -> Self {
        self.debug_images = enabled;
        self
    }

    /// A copy whose artifact writes stop, and whose remaining stages are
    /// skipped, once `gate` closes
    #[must_use]
    pub fn gated(&self, gate: WriteGate) -> Self {
        Self {
            artifacts: self.artifacts.gated(gate),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn layout(&self) -> &FormLayout {
        &self.layout
    }

    #[must_use]
    pub fn artifacts(&self) -> &ArtifactDir {
        &self.artifacts
    }

    fn checkpoint(&self, page: &PageRef) -> Result<()> {
        if self.artifacts.is_cancelled() {
            debug!("{} page {}: cancelled", page.filename, page.page_num);
            return Err(ExtractError::Cancelled);
        }
        Ok(())
    }

    /// Process one rasterized page
    pub fn process(&self, page: &PageRef, image: &DynamicImage) -> Result<PageResult> {
        enter(page, PageState::Received);
        let recognizer = self.recognizer.as_ref();
        let layout = self.layout.as_ref();

        let normalized = normalize(image.to_luma8(), recognizer, layout).into_value();
        let gray = normalized.image;
        enter(page, PageState::Normalized);
        self.checkpoint(page)?;

        let kind = validate_page(&gray, recognizer, layout);
        if *kind.value() == PageKind::NonRubric {
            let reason = kind
                .reason()
                .unwrap_or("no rubric keyword found")
                .to_string();
            return self.reject(page, &gray, &reason);
        }
        enter(page, PageState::Validated);
        self.checkpoint(page)?;

        let scored = self.score(page, &gray)?;
        enter(page, PageState::Scored);

        let unscored = scored.unscored();
        if !unscored.is_empty() {
            warn!(
                "{} page {}: questions {:?} unscored",
                page.filename, page.page_num, unscored
            );
        }
        info!(
            "{} page {}: total {}",
            page.filename, page.page_num, scored.total
        );
        enter(page, PageState::Done);
        Ok(PageResult {
            page: page.clone(),
            outcome: PageOutcome::Scored(scored),
        })
    }

    /// Save `gray` as the page's comments image and return a rejected result
    pub fn reject(&self, page: &PageRef, gray: &GrayImage, reason: &str) -> Result<PageResult> {
        let name = format!("{}_comments", page.artifact_stem());
        let comments_image = self.artifacts.save_png(&name, gray)?;
        info!(
            "{} page {}: rejected ({reason})",
            page.filename, page.page_num
        );
        enter(page, PageState::Rejected);
        Ok(PageResult {
            page: page.clone(),
            outcome: PageOutcome::Rejected {
                comments_image,
                reason: reason.to_string(),
            },
        })
    }

    fn score(&self, page: &PageRef, gray: &GrayImage) -> Result<ScoredPage> {
        let layout = self.layout.as_ref();
        let binary = binarize_inverted(gray, layout.threshold_block_radius, layout.threshold_offset);
        let cleaned = erase_lines(gray, &binary, layout);
        let grid = grid_lines_from_binary(&binary, layout);

        if self.debug_images {
            let stem = page.artifact_stem();
            self.artifacts.save_png(&format!("{stem}_binary"), &binary)?;
            self.artifacts.save_png(&format!("{stem}_cleaned"), &cleaned)?;
        }

        let (anchors, words) = match locate_anchors(&cleaned, self.recognizer.as_ref(), layout) {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    "{} page {}: word recognition failed, no anchors or fields: {e}",
                    page.filename, page.page_num
                );
                (BTreeMap::new(), Vec::new())
            }
        };

        self.checkpoint(page)?;

        let scores = ZoneScorer::new(&binary, &grid, layout).score_all(&anchors);
        let advisor = self.field(page, &cleaned, &words, &layout.advisor_field)?;
        let group = self.field(page, &cleaned, &words, &layout.group_field)?;
        Ok(ScoredPage::new(scores, advisor, group))
    }

    fn field(
        &self,
        page: &PageRef,
        cleaned: &GrayImage,
        words: &[Word],
        spec: &FieldSpec,
    ) -> Result<FieldExtraction> {
        let outcome = extract_field(
            cleaned,
            words,
            spec,
            self.recognizer.as_ref(),
            &self.artifacts,
            page,
            &self.layout,
        )?;
        if let Some(reason) = outcome.reason() {
            debug!("{} page {}: {}: {reason}", page.filename, page.page_num, spec.label);
        }
        Ok(outcome.into_value())
    }
}
