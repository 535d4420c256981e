pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::TesseractEngine;
pub use extract::{BannerCaptions, MatchIdTable, TextExtractor, fix_digits, interpret_as_number};
pub use setup::{TesseractPaths, locate_tesseract};

use anyhow::Result;
use image::DynamicImage;

/// How Tesseract should segment and read a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrMode {
    /// A small block expected to hold only digits (`--psm 6 digits`).
    Digits,
    /// Free text with automatic page segmentation (`--psm 3`).
    Text,
}

/// Turns an image into raw text.
///
/// Implemented by [`TesseractEngine`]; any `Fn(&DynamicImage, OcrMode)`
/// closure works too, which is how tests script OCR output.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage, mode: OcrMode) -> Result<String>;
}

impl<F> TextRecognizer for F
where
    F: Fn(&DynamicImage, OcrMode) -> Result<String>,
{
    fn recognize(&self, image: &DynamicImage, mode: OcrMode) -> Result<String> {
        self(image, mode)
    }
}
