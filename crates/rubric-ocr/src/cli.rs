//! Recognizer backed by the `tesseract` executable
//!
//! Every call writes the image to a scratch PNG and runs
//! `tesseract <png> stdout --psm <n> -l <lang> --oem <m> [tsv]`. The process
//! is single-threaded, so calls from several workers simply run side by side.

use crate::{osd, page_segmentation_mode, tsv};
use image::GrayImage;
use rubric_core::{LayoutMode, Orientation, Recognizer, RecognizerError, ToolConfig, Word};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Tesseract invoked as a subprocess
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
    oem: u8,
}

impl TesseractCli {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>, oem: u8) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            oem,
        }
    }

    /// Use an already resolved binary with the language and engine mode from `tools`
    #[must_use]
    pub fn from_config(binary: impl Into<PathBuf>, tools: &ToolConfig) -> Self {
        Self::new(binary, tools.language.clone(), tools.oem)
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn arguments(&self, input: &Path, mode: LayoutMode, tsv: bool) -> Vec<String> {
        let mut args = vec![
            input.display().to_string(),
            "stdout".to_string(),
            "--psm".to_string(),
            page_segmentation_mode(mode).to_string(),
        ];
        // OSD runs on its own model; language and engine flags do not apply
        if mode != LayoutMode::Orientation {
            args.extend([
                "-l".to_string(),
                self.language.clone(),
                "--oem".to_string(),
                self.oem.to_string(),
            ]);
        }
        if tsv {
            args.push("tsv".to_string());
        }
        args
    }

    fn run(&self, image: &GrayImage, mode: LayoutMode, tsv: bool) -> Result<String, RecognizerError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RecognizerError::InvalidDimensions(width, height));
        }

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("page.png");
        image.save(&input)?;

        let args = self.arguments(&input, mode, tsv);
        debug!("{} {}", self.binary.display(), args.join(" "));
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RecognizerError::BinaryNotFound(self.binary.clone()),
                _ => RecognizerError::Io(e),
            })?;

        // OSD writes its report to stderr on some Tesseract builds
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(RecognizerError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        if mode == LayoutMode::Orientation && !stdout.contains("Rotate:") {
            return Ok(stderr);
        }
        Ok(stdout)
    }
}

impl Recognizer for TesseractCli {
    fn recognize_text(&self, image: &GrayImage, mode: LayoutMode) -> Result<String, RecognizerError> {
        self.run(image, mode, false)
    }

    fn recognize_words(
        &self,
        image: &GrayImage,
        mode: LayoutMode,
    ) -> Result<Vec<Word>, RecognizerError> {
        let report = self.run(image, mode, true)?;
        tsv::parse_words(&report)
    }

    fn detect_orientation(&self, image: &GrayImage) -> Result<Orientation, RecognizerError> {
        let report = self.run(image, LayoutMode::Orientation, false)?;
        osd::parse_osd(&report)
    }
}
