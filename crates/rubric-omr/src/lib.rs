//! Optical mark recognition for scanned rubric forms
//!
//! # Architecture
//!
//! Each page runs through a fixed sequence of stages:
//! 1. **Normalize** ([`deskew`]): straighten small rotations reported by the recognizer
//! 2. **Validate** ([`validate`]): reject pages without rubric keywords
//! 3. **Strip lines** ([`lines`]): erase ruled table borders from the copy used for OCR
//! 4. **Locate grid** ([`grid`]): vertical answer-column boundaries from the uncleaned page
//! 5. **Locate anchors** ([`anchors`]): question number labels in the left margin
//! 6. **Score** ([`scorer`]): pick the marked zone per question by relative ink density
//! 7. **Extract fields** ([`fields`]): crop and read the handwritten advisor and group names
//!
//! [`page::PagePipeline`] sequences the stages for one page and
//! [`batch::BatchExtractor`] fans documents and pages out over a worker pool.
//! Every stage is a pure function of its image buffers, so pages never share
//! state.

pub mod anchors;
pub mod artifacts;
pub mod batch;
pub mod binarize;
pub mod deskew;
pub mod fields;
pub mod grid;
pub mod lines;
pub mod page;
pub mod scorer;
pub mod text;
pub mod validate;

pub use artifacts::{ArtifactDir, WriteGate};
pub use batch::{BatchExtractor, BatchReport, BatchSummary, Document, DocumentReport};
pub use binarize::InkMap;
pub use page::{PagePipeline, PageState};
pub use scorer::{ZoneDecision, ZoneScorer};
pub use text::{read_text_layers, TextExtractor, TextResult};
