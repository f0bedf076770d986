//! Saved page artifacts (field crops, comment pages, debug images)
//!
//! Images are written under `<root>/images/` and referred to by paths
//! relative to `<root>`, which is what ends up in the results table. Every
//! clone of an [`ArtifactDir`] records into the same list of saved files, so
//! a run can tell its own images apart from leftovers of earlier runs.

use image::GrayImage;
use rubric_core::{ExtractError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Subdirectory holding all saved images
pub const IMAGES_DIR: &str = "images";

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct GateState {
    closed: bool,
    written: Vec<PathBuf>,
}

/// Stops a page's writes once its result is no longer wanted.
///
/// Writes through a gated [`ArtifactDir`] happen while holding the gate, so
/// after [`WriteGate::close`] returns no further file appears, and the files
/// written before are handed back for removal.
#[derive(Debug, Clone, Default)]
pub struct WriteGate(Arc<Mutex<GateState>>);

impl WriteGate {
    /// Refuse all further writes; returns the files written so far
    pub fn close(&self) -> Vec<PathBuf> {
        let mut state = locked(&self.0);
        state.closed = true;
        std::mem::take(&mut state.written)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        locked(&self.0).closed
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactDir {
    root: PathBuf,
    saved: Arc<Mutex<BTreeSet<PathBuf>>>,
    gate: Option<WriteGate>,
}

impl ArtifactDir {
    /// Use `root` as the artifact root, creating `root/images` if needed
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(IMAGES_DIR))?;
        Ok(Self {
            root,
            saved: Arc::default(),
            gate: None,
        })
    }

    /// A handle whose writes stop when `gate` closes
    #[must_use]
    pub fn gated(&self, gate: WriteGate) -> Self {
        Self {
            gate: Some(gate),
            ..self.clone()
        }
    }

    /// Whether this handle's gate has closed
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.gate.as_ref().is_some_and(WriteGate::is_closed)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save `image` as `images/<name>.png`; returns the path relative to the root
    pub fn save_png(&self, name: &str, image: &GrayImage) -> Result<PathBuf> {
        let relative = Path::new(IMAGES_DIR).join(format!("{name}.png"));
        match &self.gate {
            Some(gate) => {
                let mut state = locked(&gate.0);
                if state.closed {
                    return Err(ExtractError::Cancelled);
                }
                self.write(&relative, image)?;
                state.written.push(relative.clone());
            }
            None => self.write(&relative, image)?,
        }
        Ok(relative)
    }

    fn write(&self, relative: &Path, image: &GrayImage) -> Result<()> {
        let absolute = self.root.join(relative);
        image.save(&absolute)?;
        locked(&self.saved).insert(relative.to_path_buf());
        debug!("Saved {}", absolute.display());
        Ok(())
    }

    /// Delete images saved by this run, e.g. those of a cancelled page
    pub fn discard(&self, relatives: &[PathBuf]) {
        let mut saved = locked(&self.saved);
        for relative in relatives {
            saved.remove(relative);
            if let Err(e) = std::fs::remove_file(self.root.join(relative)) {
                warn!("Failed to remove {}: {e}", relative.display());
            }
        }
    }

    /// Absolute path of an artifact-relative path
    #[must_use]
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Relative paths of the images saved through this directory, sorted
    #[must_use]
    pub fn saved(&self) -> Vec<PathBuf> {
        locked(&self.saved).iter().cloned().collect()
    }

    /// Relative paths of every file in `images/`, sorted, including files
    /// left there by earlier runs
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(self.root.join(IMAGES_DIR))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(Path::new(IMAGES_DIR).join(entry.file_name()));
            }
        }
        files.sort();
        Ok(files)
    }
}
