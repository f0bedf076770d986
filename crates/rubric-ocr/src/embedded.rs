//! In-process recognizer through libtesseract
//!
//! A fresh `LepTess` handle is created per call because the handle is not
//! `Sync`. Orientation detection is not exposed by `leptess`, so
//! [`EmbeddedTesseract::detect_orientation`] reports `Unsupported` and callers
//! keep the page as is.

use crate::page_segmentation_mode;
use image::{GrayImage, ImageFormat};
use leptess::{LepTess, Variable};
use rubric_core::{BoundingBox, LayoutMode, Orientation, Recognizer, RecognizerError, Word};
use std::io::Cursor;

#[derive(Debug, Clone)]
pub struct EmbeddedTesseract {
    language: String,
}

impl EmbeddedTesseract {
    /// Verify that Tesseract initializes with `language` before handing out a recognizer
    pub fn new(language: impl Into<String>) -> Result<Self, RecognizerError> {
        let language = language.into();
        let _engine = LepTess::new(None, &language).map_err(|e| RecognizerError::Failed {
            status: "init".to_string(),
            stderr: format!("language '{language}': {e}"),
        })?;
        Ok(Self { language })
    }

    fn load(&self, image: &GrayImage, mode: LayoutMode) -> Result<LepTess, RecognizerError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RecognizerError::InvalidDimensions(width, height));
        }

        let mut lt = LepTess::new(None, &self.language).map_err(|e| RecognizerError::Failed {
            status: "init".to_string(),
            stderr: e.to_string(),
        })?;
        lt.set_variable(
            Variable::TesseditPagesegMode,
            &page_segmentation_mode(mode).to_string(),
        )
        .map_err(|e| RecognizerError::Failed {
            status: "psm".to_string(),
            stderr: e.to_string(),
        })?;

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        lt.set_image_from_mem(png.get_ref())
            .map_err(|e| RecognizerError::Image(e.to_string()))?;
        Ok(lt)
    }
}

impl Recognizer for EmbeddedTesseract {
    fn recognize_text(&self, image: &GrayImage, mode: LayoutMode) -> Result<String, RecognizerError> {
        let mut lt = self.load(image, mode)?;
        lt.get_utf8_text()
            .map_err(|e| RecognizerError::Parse(e.to_string()))
    }

    fn recognize_words(
        &self,
        image: &GrayImage,
        mode: LayoutMode,
    ) -> Result<Vec<Word>, RecognizerError> {
        let mut lt = self.load(image, mode)?;
        // None means no text on the page
        let Some(boxes) =
            lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true)
        else {
            return Ok(Vec::new());
        };

        let mut words = Vec::new();
        for component in &boxes {
            let geom = component.get_geometry();
            lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);
            let text = lt.get_utf8_text().unwrap_or_default().trim().to_string();
            if text.is_empty() {
                continue;
            }
            let bbox = BoundingBox::new(
                geom.x.max(0) as u32,
                geom.y.max(0) as u32,
                geom.w.max(0) as u32,
                geom.h.max(0) as u32,
            );
            words.push(Word::new(text, bbox, lt.mean_text_conf() as f32));
        }
        Ok(words)
    }

    fn detect_orientation(&self, _image: &GrayImage) -> Result<Orientation, RecognizerError> {
        Err(RecognizerError::Unsupported("orientation detection"))
    }
}
