//! Shared types for rubric form extraction
//!
//! This crate holds everything the pipeline stages and the external tool
//! adapters agree on:
//! - the page data model ([`PageResult`], [`ScoreResult`], [`FieldExtraction`])
//! - the rubric table (question criteria, score descriptors, validation keywords)
//! - the fixed structural priors of the form ([`FormLayout`])
//! - process-wide configuration ([`ExtractorConfig`], [`ResolvedTools`])
//! - the collaborator seams ([`Recognizer`], [`Rasterizer`])
//! - error types and the [`Outcome`] soft-failure wrapper

pub mod collaborators;
pub mod config;
pub mod error;
pub mod layout;
pub mod outcome;
pub mod rubric;
pub mod types;

pub use collaborators::{LayoutMode, Orientation, Rasterizer, Recognizer, Word};
pub use config::{ExtractorConfig, PipelineConfig, ResolvedTools, ToolConfig, ToolHealth};
pub use error::{ConfigError, ExtractError, RasterizeError, RecognizerError, Result};
pub use layout::{FieldSpec, FormLayout};
pub use outcome::Outcome;
pub use rubric::{describe, QUESTION_COUNT, QUESTION_IDS, RUBRIC_KEYWORDS};
pub use types::{
    AnchorBox, BoundingBox, FieldExtraction, PageOutcome, PageRef, PageResult, QuestionId, Score,
    ScoreResult, ScoredPage, SCORE_SCALE,
};
