//! Batch extraction over many documents
//!
//! Documents and their pages are independent units of work, spread over a
//! bounded rayon pool. Failure handling is layered:
//! - a missing rasterizer binary aborts the whole batch
//! - any other failure inside a document skips that document only
//! - a page that exceeds its time budget is rejected, not failed; whatever it
//!   had already written is removed and its worker stops at the next stage
//! - a batch in which no page produced a result is an error

use crate::artifacts::WriteGate;
use crate::page::PagePipeline;
use image::DynamicImage;
use rayon::prelude::*;
use rubric_core::{
    ExtractError, PageRef, PageResult, PipelineConfig, RasterizeError, Rasterizer, Result,
};
use serde::Serialize;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A PDF to process
#[derive(Debug, Clone)]
pub struct Document {
    /// Name reported in results (usually the file name)
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a PDF from disk, naming it by its file name
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { filename, bytes })
    }
}

/// Results for one document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub filename: String,
    /// Page results in page order; empty when the document failed
    pub pages: Vec<PageResult>,
    /// Why the document was skipped
    pub error: Option<String>,
}

impl DocumentReport {
    fn failed(filename: &str, err: &ExtractError) -> Self {
        Self {
            filename: filename.to_string(),
            pages: Vec::new(),
            error: Some(err.to_string()),
        }
    }
}

/// Counts over a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub documents: usize,
    pub documents_failed: usize,
    pub pages_scored: usize,
    pub pages_rejected: usize,
    pub questions_unscored: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// All page results, document by document
    pub fn pages(&self) -> impl Iterator<Item = &PageResult> {
        self.documents.iter().flat_map(|d| d.pages.iter())
    }

    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            documents: self.documents.len(),
            documents_failed: self.documents.iter().filter(|d| d.error.is_some()).count(),
            ..Default::default()
        };
        for page in self.pages() {
            match page.scored() {
                Some(scored) => {
                    summary.pages_scored += 1;
                    summary.questions_unscored += scored.unscored().len();
                }
                None => summary.pages_rejected += 1,
            }
        }
        summary
    }
}

/// Rasterizes documents and runs every page through a [`PagePipeline`]
pub struct BatchExtractor {
    rasterizer: Arc<dyn Rasterizer>,
    pipeline: PagePipeline,
    dpi: u32,
    page_timeout: Option<Duration>,
    pool: rayon::ThreadPool,
}

impl BatchExtractor {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        pipeline: PagePipeline,
        dpi: u32,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let workers = config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("rubric-worker-{i}"))
            .build()
            .map_err(|e| ExtractError::WorkerPool(e.to_string()))?;
        info!("Batch extractor using {workers} worker(s) at {dpi} DPI");

        Ok(Self {
            rasterizer,
            pipeline,
            dpi,
            page_timeout: config.page_timeout(),
            pool,
        })
    }

    /// Process every document.
    ///
    /// Returns per-document reports in input order. Fails only when the
    /// rasterizer is not installed or nothing at all was extracted.
    pub fn run(&self, documents: &[Document]) -> Result<BatchReport> {
        let start = Instant::now();
        let results: Vec<Result<DocumentReport>> = self.pool.install(|| {
            documents
                .par_iter()
                .enumerate()
                .map(|(i, doc)| self.process_document(i + 1, doc))
                .collect()
        });

        let documents = results.into_iter().collect::<Result<Vec<_>>>()?;
        let report = BatchReport {
            documents,
            elapsed: start.elapsed(),
        };

        let summary = report.summary();
        info!(
            "Batch done in {:.2}s: {} document(s), {} failed, {} page(s) scored, {} rejected, {} question(s) unscored",
            report.elapsed.as_secs_f64(),
            summary.documents,
            summary.documents_failed,
            summary.pages_scored,
            summary.pages_rejected,
            summary.questions_unscored
        );

        if summary.pages_scored + summary.pages_rejected == 0 {
            return Err(ExtractError::NoDataExtracted);
        }
        Ok(report)
    }

    /// `Err` only for failures that must abort the batch
    fn process_document(&self, index: usize, doc: &Document) -> Result<DocumentReport> {
        let images = match self.rasterizer.rasterize(&doc.bytes, self.dpi) {
            Ok(images) => images,
            Err(e @ RasterizeError::BinaryNotFound(_)) => return Err(e.into()),
            Err(e) => {
                let err = ExtractError::from(e);
                error!("Skipping {}: {err}", doc.filename);
                return Ok(DocumentReport::failed(&doc.filename, &err));
            }
        };
        info!("{}: {} page(s)", doc.filename, images.len());

        let pages: Result<Vec<PageResult>> = images
            .into_par_iter()
            .enumerate()
            .map(|(i, image)| {
                let page = PageRef::new(&doc.filename, i + 1).in_document(index);
                self.process_page(page, image)
            })
            .collect();

        match pages {
            Ok(pages) => Ok(DocumentReport {
                filename: doc.filename.clone(),
                pages,
                error: None,
            }),
            Err(err) => {
                error!("Skipping {}: {err}", doc.filename);
                Ok(DocumentReport::failed(&doc.filename, &err))
            }
        }
    }

    fn process_page(&self, page: PageRef, image: DynamicImage) -> Result<PageResult> {
        let Some(budget) = self.page_timeout else {
            return self.pipeline.process(&page, &image);
        };

        // the worker gets its own copy; the luma copy is kept for rejection
        let gray = image.to_luma8();
        let (tx, rx) = mpsc::channel();
        let gate = WriteGate::default();
        let pipeline = self.pipeline.gated(gate.clone());
        let worker_page = page.clone();
        std::thread::Builder::new()
            .name(format!("rubric-page-{}", page.page_num))
            .spawn(move || {
                // the receiver is gone once the page timed out
                let _ = tx.send(pipeline.process(&worker_page, &image));
            })?;

        match rx.recv_timeout(budget) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "{} page {}: exceeded {}s budget",
                    page.filename,
                    page.page_num,
                    budget.as_secs()
                );
                let orphans = gate.close();
                self.pipeline.artifacts().discard(&orphans);
                self.pipeline.reject(
                    &page,
                    &gray,
                    &format!("timed out after {}s", budget.as_secs()),
                )
            }
            Err(RecvTimeoutError::Disconnected) => Err(ExtractError::WorkerPool(format!(
                "page {} worker exited without a result",
                page.page_num
            ))),
        }
    }
}
