//! Error types for rubric extraction
//!
//! Errors are split by who raises them. Recognizer and rasterizer errors come
//! from the external tool adapters; [`ConfigError`] is raised while resolving
//! configuration at startup; [`ExtractError`] is what the batch runner hands
//! back to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a text recognizer
#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("Recognizer binary not found: {0}")]
    BinaryNotFound(PathBuf),

    #[error("Recognizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Failed to parse recognizer output: {0}")]
    Parse(String),

    #[error("Recognizer does not support {0}")]
    Unsupported(&'static str),

    #[error("Invalid image dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(String),
}

impl From<image::ImageError> for RecognizerError {
    fn from(err: image::ImageError) -> Self {
        RecognizerError::Image(err.to_string())
    }
}

/// Errors raised by a PDF rasterizer
#[derive(Error, Debug)]
pub enum RasterizeError {
    /// The rasterizer binary could not be located. Fatal for the whole batch.
    #[error("Rasterizer binary not found: {0}")]
    BinaryNotFound(PathBuf),

    #[error("Rasterizer failed: {0}")]
    Failed(String),

    #[error("Document produced no pages")]
    NoPages,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(String),
}

impl From<image::ImageError> for RasterizeError {
    fn from(err: image::ImageError) -> Self {
        RasterizeError::Image(err.to_string())
    }
}

/// Errors raised while loading or resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{tool} not found ({hint})")]
    ToolNotFound { tool: &'static str, hint: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by page and batch processing
#[derive(Error, Debug)]
pub enum ExtractError {
    /// An external tool is unresolvable. Aborts the batch, never retried.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Rasterization failed: {0}")]
    Rasterize(#[from] RasterizeError),

    /// No page in the batch produced a result
    #[error("No data extracted from any document")]
    NoDataExtracted,

    #[error("Failed to read PDF text layer: {0}")]
    TextLayer(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// The page's time budget ran out; its remaining work was abandoned
    #[error("Page processing cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(String),
}

impl From<image::ImageError> for ExtractError {
    fn from(err: image::ImageError) -> Self {
        ExtractError::Image(err.to_string())
    }
}

/// Result type for page and batch operations
pub type Result<T> = std::result::Result<T, ExtractError>;
