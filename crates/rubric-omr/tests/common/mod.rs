//! Common test utilities: scripted collaborators and synthetic rubric pages

#![allow(dead_code)]

use image::{DynamicImage, GrayImage, Luma};
use rubric_core::{
    BoundingBox, LayoutMode, Orientation, RasterizeError, Rasterizer, Recognizer, RecognizerError,
    Word,
};
use std::sync::Mutex;
use std::time::Duration;

pub const PAGE_WIDTH: u32 = 1000;
pub const PAGE_HEIGHT: u32 = 800;

/// Answer grid boundaries (x)
pub const GRID: [u32; 6] = [460, 560, 660, 760, 860, 960];

const FIRST_ROW_Y: u32 = 120;
const ROW_STEP: u32 = 55;

/// y of question `q`'s anchor box
pub fn anchor_y(question: u8) -> u32 {
    FIRST_ROW_Y + u32::from(question - 1) * ROW_STEP
}

/// Recognizer with scripted answers
pub struct FakeRecognizer {
    /// Returned for single-block text (page validation)
    pub page_text: String,
    /// Returned for single-line text (field crops)
    pub field_text: String,
    pub words: Vec<Word>,
    /// `None` makes orientation detection fail
    pub rotate: Option<f32>,
    /// Delay before returning words
    pub word_delay: Option<Duration>,
    /// Dimensions of every image word recognition was run on
    pub word_images: Mutex<Vec<(u32, u32)>>,
    /// Dimensions of every image single-block text recognition was run on
    pub text_images: Mutex<Vec<(u32, u32)>>,
    /// Names of the threads single-block text recognition ran on
    pub text_threads: Mutex<Vec<String>>,
    /// Makes text recognition fail
    pub text_fails: bool,
}

impl FakeRecognizer {
    pub fn rubric(words: Vec<Word>) -> Self {
        Self {
            page_text: "CAPSTONE PROJECT EVALUATION RUBRIC".to_string(),
            field_text: "Jane Doe".to_string(),
            words,
            rotate: Some(0.0),
            word_delay: None,
            word_images: Mutex::new(Vec::new()),
            text_images: Mutex::new(Vec::new()),
            text_threads: Mutex::new(Vec::new()),
            text_fails: false,
        }
    }

    pub fn comments() -> Self {
        Self {
            page_text: "Additional comments: strong delivery, weak citations.".to_string(),
            ..Self::rubric(Vec::new())
        }
    }
}

impl Recognizer for FakeRecognizer {
    fn recognize_text(&self, image: &GrayImage, mode: LayoutMode) -> Result<String, RecognizerError> {
        if self.text_fails {
            return Err(RecognizerError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "Error opening data file".to_string(),
            });
        }
        match mode {
            LayoutMode::SingleLine => Ok(self.field_text.clone()),
            _ => {
                self.text_images.lock().unwrap().push(image.dimensions());
                let thread = std::thread::current().name().unwrap_or_default().to_string();
                self.text_threads.lock().unwrap().push(thread);
                Ok(self.page_text.clone())
            }
        }
    }

    fn recognize_words(
        &self,
        image: &GrayImage,
        _: LayoutMode,
    ) -> Result<Vec<Word>, RecognizerError> {
        self.word_images.lock().unwrap().push(image.dimensions());
        if let Some(delay) = self.word_delay {
            std::thread::sleep(delay);
        }
        Ok(self.words.clone())
    }

    fn detect_orientation(&self, _: &GrayImage) -> Result<Orientation, RecognizerError> {
        self.rotate
            .map(|rotate_degrees| Orientation {
                rotate_degrees,
                confidence: 3.5,
            })
            .ok_or_else(|| RecognizerError::Parse("no Rotate line".to_string()))
    }
}

/// Rasterizer returning the same pages for every document, or failing
pub enum FakeRasterizer {
    Pages(Vec<GrayImage>),
    Broken,
    Missing,
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, pdf: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, RasterizeError> {
        match self {
            Self::Pages(pages) if !pdf.starts_with(b"corrupt") => {
                Ok(pages.iter().cloned().map(DynamicImage::ImageLuma8).collect())
            }
            Self::Pages(_) | Self::Broken => {
                Err(RasterizeError::Failed("Syntax Error: Couldn't find trailer".to_string()))
            }
            Self::Missing => Err(RasterizeError::BinaryNotFound("pdftoppm".into())),
        }
    }
}

/// One-page PDF whose text layer reads `text`, with a valid xref table
pub fn text_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

/// A synthetic rubric sheet: eleven ruled rows with an X in the marked column
pub struct RubricPage {
    /// Marked column per question (index 0 = question 1)
    pub marks: [Option<usize>; 11],
}

impl RubricPage {
    pub fn new(marks: [Option<usize>; 11]) -> Self {
        Self { marks }
    }

    pub fn render(&self) -> GrayImage {
        let mut img = GrayImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Luma([255]));
        let top = anchor_y(1) - 13;
        let bottom = anchor_y(11) + 42;

        for &x in &GRID {
            fill_rect(&mut img, x, top, 2, bottom - top);
        }
        fill_rect(&mut img, 30, top, 2, bottom - top);
        for q in 1..=12u8 {
            let y = FIRST_ROW_Y + u32::from(q - 1) * ROW_STEP - 13;
            fill_rect(&mut img, 30, y, GRID[5] - 28, 2);
        }

        for (i, mark) in self.marks.iter().enumerate() {
            if let Some(column) = mark {
                let x = GRID[*column] + 15;
                let y = anchor_y(i as u8 + 1);
                draw_x(&mut img, x, y, 60, 30);
            }
        }
        img
    }

    /// Words a recognizer would report for the cleaned page
    pub fn words(&self) -> Vec<Word> {
        let mut words = vec![
            Word::new("Advisor:", BoundingBox::new(60, 30, 90, 25), 91.0),
            Word::new("Group:", BoundingBox::new(560, 30, 70, 25), 89.0),
        ];
        for q in 1..=11u8 {
            words.push(Word::new(
                format!("{q}."),
                BoundingBox::new(40, anchor_y(q), 30, 20),
                88.0,
            ));
            // question text, starting right of the margin
            words.push(Word::new(
                format!("{q}"),
                BoundingBox::new(200, anchor_y(q), 20, 20),
                95.0,
            ));
        }
        words
    }
}

fn fill_rect(img: &mut GrayImage, x: u32, y: u32, width: u32, height: u32) {
    for yy in y..y + height {
        for xx in x..x + width {
            img.put_pixel(xx, yy, Luma([0]));
        }
    }
}

/// Two 3 px diagonals across the box at (x, y)
fn draw_x(img: &mut GrayImage, x: u32, y: u32, width: u32, height: u32) {
    for i in 0..width {
        let dy = i * height / width;
        for t in 0..3 {
            img.put_pixel(x + i, y + dy + t, Luma([0]));
            img.put_pixel(x + i, y + height - dy + t, Luma([0]));
        }
    }
}
