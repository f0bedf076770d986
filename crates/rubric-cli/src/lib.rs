//! Support code for the `rubric-extract` binary
//!
//! ```bash
//! # Score every rubric page and write results.csv + images/
//! rubric-extract extract forms/*.pdf --output-dir out --bundle out.zip
//!
//! # Plain OCR text of each document as JSON
//! rubric-extract text notes.pdf
//!
//! # Are tesseract and pdftoppm installed?
//! rubric-extract health
//! ```

pub mod export;

use rubric_core::ToolHealth;
use serde::Serialize;

/// Body of the `health` command
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    #[serde(flatten)]
    pub tools: ToolHealth,
}

impl From<ToolHealth> for HealthReport {
    fn from(tools: ToolHealth) -> Self {
        Self { status: "ok", tools }
    }
}
