//! PDF rasterization with poppler's `pdftoppm`
//!
//! The document is written to a scratch directory and rendered with
//! `pdftoppm -r <dpi> -gray -png input.pdf <dir>/page`. Poppler names the
//! output `page-<n>.png`, zero-padding `<n>` to the width of the page count,
//! so files are ordered by the parsed page number rather than by name.

use image::DynamicImage;
use rubric_core::{RasterizeError, Rasterizer};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const OUTPUT_PREFIX: &str = "page";

/// Rasterizer that shells out to `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

/// Page number of a `page-<n>.png` file
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (prefix, number) = stem.rsplit_once('-')?;
    if prefix != OUTPUT_PREFIX {
        return None;
    }
    number.parse().ok()
}

/// Rendered page files in `dir`, in page order
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, RasterizeError> {
    let mut pages: Vec<(u32, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, RasterizeError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("input.pdf");
        fs::write(&input, pdf)?;

        let output = Command::new(&self.binary)
            .arg("-r")
            .arg(dpi.to_string())
            .args(["-gray", "-png"])
            .arg(&input)
            .arg(scratch.path().join(OUTPUT_PREFIX))
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RasterizeError::BinaryNotFound(self.binary.clone()),
                _ => RasterizeError::Io(e),
            })?;

        if !output.status.success() {
            return Err(RasterizeError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let pages = rendered_pages(scratch.path())?;
        if pages.is_empty() {
            return Err(RasterizeError::NoPages);
        }
        debug!("Rendered {} page(s) at {} dpi", pages.len(), dpi);

        pages
            .iter()
            .map(|path| image::open(path).map_err(RasterizeError::from))
            .collect()
    }
}
