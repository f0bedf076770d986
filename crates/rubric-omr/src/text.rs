//! Plain-text extraction
//!
//! Full-page OCR of every page, for documents where only the text matters.
//! Pages are orientation-corrected, upscaled and cleaned up before
//! recognition. When a document cannot be rasterized or recognized, for
//! whatever reason including a missing tool, the PDF's own text layer is used
//! instead.

use crate::batch::Document;
use crate::binarize::binarize_for_recognition;
use crate::deskew::correct_orientation;
use image::{imageops, GrayImage};
use imageproc::filter::median_filter;
use rayon::prelude::*;
use rubric_core::{
    ExtractError, LayoutMode, PipelineConfig, Rasterizer, Recognizer, Result, ToolConfig,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Window size of the recognition threshold
const THRESHOLD_BLOCK: u32 = 31;

/// Offset of the recognition threshold
const THRESHOLD_OFFSET: f32 = 15.0;

/// Orientation reports below a full turn are all corrected in text mode
const FULL_TURN: f32 = 360.0;

/// Text of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextResult {
    pub filename: String,
    pub text: String,
}

impl TextResult {
    /// A document whose text could not be read at all yields empty text
    fn new(doc: &Document, text: Result<String>) -> Self {
        let text = text.unwrap_or_else(|e| {
            warn!("No text for {}: {e}", doc.filename);
            String::new()
        });
        Self {
            filename: doc.filename.clone(),
            text,
        }
    }
}

/// Upscale short pages to `target_height`, remove speckle noise and
/// threshold to black text on white
#[must_use]
pub fn prepare_for_recognition(gray: &GrayImage, target_height: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let scaled = if height > 0 && height < target_height {
        let scale = target_height as f32 / height as f32;
        let new_width = ((width as f32 * scale) as u32).max(1);
        imageops::resize(gray, new_width, target_height, imageops::FilterType::CatmullRom)
    } else {
        gray.clone()
    };
    let denoised = median_filter(&scaled, 1, 1);
    binarize_for_recognition(&denoised, THRESHOLD_BLOCK, THRESHOLD_OFFSET)
}

/// Plain-text OCR over whole documents
pub struct TextExtractor {
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn Recognizer>,
    dpi: u32,
    target_height: u32,
    pool: rayon::ThreadPool,
}

impl TextExtractor {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn Recognizer>,
        tools: &ToolConfig,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let workers = config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("rubric-text-{i}"))
            .build()
            .map_err(|e| ExtractError::WorkerPool(e.to_string()))?;
        debug!("Text extractor using {workers} worker(s)");

        Ok(Self {
            rasterizer,
            recognizer,
            dpi: tools.dpi,
            target_height: tools.ocr_target_height,
            pool,
        })
    }

    /// Text of every document, in input order
    #[must_use]
    pub fn run(&self, documents: &[Document]) -> Vec<TextResult> {
        self.pool.install(|| {
            documents
                .par_iter()
                .map(|doc| TextResult::new(doc, self.extract(doc)))
                .collect()
        })
    }

    /// OCR text of one document, falling back to its text layer
    pub fn extract(&self, doc: &Document) -> Result<String> {
        self.recognize_document(doc).or_else(|e| {
            info!("{}: OCR unavailable ({e}), using text layer", doc.filename);
            text_layer(&doc.bytes)
        })
    }

    fn recognize_document(&self, doc: &Document) -> Result<String> {
        let pages = self.rasterizer.rasterize(&doc.bytes, self.dpi)?;
        let mut parts = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            let upright =
                correct_orientation(page.to_luma8(), self.recognizer.as_ref(), FULL_TURN)
                    .into_value()
                    .image;
            let prepared = prepare_for_recognition(&upright, self.target_height);
            let text = self
                .recognizer
                .recognize_text(&prepared, LayoutMode::SingleBlock)
                .map_err(|e| ExtractError::TextLayer(format!("page {}: {e}", i + 1)))?;
            debug!("{} page {}: {} chars", doc.filename, i + 1, text.len());
            parts.push(text);
        }
        Ok(parts.join("\n"))
    }
}

/// Text embedded in the PDF itself
pub fn text_layer(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::TextLayer(e.to_string()))
}

/// Text layer of every document, in input order. Used when the OCR tools
/// are not installed.
#[must_use]
pub fn read_text_layers(documents: &[Document]) -> Vec<TextResult> {
    documents
        .iter()
        .map(|doc| TextResult::new(doc, text_layer(&doc.bytes)))
        .collect()
}
