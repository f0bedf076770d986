//! Process-wide configuration
//!
//! Configuration is resolved once at startup and passed down. Precedence
//! (highest to lowest):
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment (`TESSERACT_CMD`, `POPPLER_PATH`, `OCR_DPI`, `OCR_LANG`,
//!    `OCR_OEM`, `OCR_TARGET_HEIGHT`)
//! 3. Config file (`--config <file>` or `./.rubric.toml`)
//! 4. Built-in defaults

use crate::error::ConfigError;
use crate::layout::FormLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Project config file looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = ".rubric.toml";

/// Default rasterization resolution
pub const DEFAULT_DPI: u32 = 300;

/// Pages shorter than this are upscaled before full-page OCR
pub const DEFAULT_OCR_TARGET_HEIGHT: u32 = 1500;

/// External tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Tesseract executable (path or name on PATH)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tesseract_cmd: Option<PathBuf>,
    /// Directory holding the poppler binaries (`pdftoppm`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poppler_path: Option<PathBuf>,
    /// Tesseract language codes (e.g. "eng", "eng+fra")
    pub language: String,
    /// Tesseract OCR engine mode
    pub oem: u8,
    /// Rasterization resolution
    pub dpi: u32,
    /// Target page height for full-page OCR preprocessing
    pub ocr_target_height: u32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: None,
            poppler_path: None,
            language: "eng".to_string(),
            oem: 1,
            dpi: DEFAULT_DPI,
            ocr_target_height: DEFAULT_OCR_TARGET_HEIGHT,
        }
    }
}

/// Batch execution settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads; defaults to the available CPU cores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Wall-clock budget per page; expired pages are rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_timeout_secs: Option<u64>,
    /// Save the binarized and line-stripped copies of every page
    pub debug_images: bool,
}

impl PipelineConfig {
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }

    #[must_use]
    pub fn page_timeout(&self) -> Option<Duration> {
        self.page_timeout_secs
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub tools: ToolConfig,
    pub pipeline: PipelineConfig,
    pub layout: FormLayout,
}

impl ExtractorConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit config file if given, else `./.rubric.toml` if it
    /// exists, else defaults; then apply environment overrides.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let project = Path::new(PROJECT_CONFIG_FILE);
                if project.exists() {
                    debug!("Loading project config from {}", project.display());
                    Self::load_from_file(project)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(cmd) = lookup("TESSERACT_CMD").filter(|v| !v.is_empty()) {
            self.tools.tesseract_cmd = Some(PathBuf::from(cmd));
        }
        if let Some(dir) = lookup("POPPLER_PATH").filter(|v| !v.is_empty()) {
            self.tools.poppler_path = Some(PathBuf::from(dir));
        }
        if let Some(lang) = lookup("OCR_LANG").filter(|v| !v.is_empty()) {
            self.tools.language = lang;
        }
        if let Some(dpi) = lookup("OCR_DPI") {
            self.tools.dpi = parse_env("OCR_DPI", &dpi)?;
        }
        if let Some(oem) = lookup("OCR_OEM") {
            self.tools.oem = parse_env("OCR_OEM", &oem)?;
        }
        if let Some(height) = lookup("OCR_TARGET_HEIGHT") {
            self.tools.ocr_target_height = parse_env("OCR_TARGET_HEIGHT", &height)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

/// Absolute paths of the external binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTools {
    pub tesseract: PathBuf,
    pub pdftoppm: PathBuf,
}

/// Availability of the external binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHealth {
    pub tesseract_available: bool,
    pub poppler_available: bool,
}

impl ToolConfig {
    /// Locate the recognizer binary
    pub fn resolve_tesseract(&self) -> Result<PathBuf, ConfigError> {
        let cmd = self
            .tesseract_cmd
            .clone()
            .unwrap_or_else(|| PathBuf::from("tesseract"));
        if cmd.is_file() {
            return Ok(cmd);
        }
        which::which(&cmd).map_err(|e| ConfigError::ToolNotFound {
            tool: "tesseract",
            hint: format!("{}: {e}; install Tesseract or set TESSERACT_CMD", cmd.display()),
        })
    }

    /// Locate the rasterizer binary
    pub fn resolve_pdftoppm(&self) -> Result<PathBuf, ConfigError> {
        let binary = format!("pdftoppm{}", std::env::consts::EXE_SUFFIX);
        match &self.poppler_path {
            Some(dir) => {
                let candidate = dir.join(&binary);
                if candidate.is_file() {
                    Ok(candidate)
                } else {
                    Err(ConfigError::ToolNotFound {
                        tool: "pdftoppm",
                        hint: format!("no {binary} in POPPLER_PATH {}", dir.display()),
                    })
                }
            }
            None => which::which(&binary).map_err(|e| ConfigError::ToolNotFound {
                tool: "pdftoppm",
                hint: format!("{e}; install poppler-utils or set POPPLER_PATH"),
            }),
        }
    }

    /// Locate both binaries
    pub fn resolve(&self) -> Result<ResolvedTools, ConfigError> {
        Ok(ResolvedTools {
            tesseract: self.resolve_tesseract()?,
            pdftoppm: self.resolve_pdftoppm()?,
        })
    }

    /// Whether each binary resolves in the current environment
    #[must_use]
    pub fn health(&self) -> ToolHealth {
        ToolHealth {
            tesseract_available: self.resolve_tesseract().is_ok(),
            poppler_available: self.resolve_pdftoppm().is_ok(),
        }
    }
}
