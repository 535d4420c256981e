use std::path::PathBuf;
use thiserror::Error;

use super::regions::Rect;

/// A specialized `Result` type for frame analysis.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors raised while analysing a single frame or loading vision assets.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("OCR failed: {0:#}")]
    Ocr(#[from] anyhow::Error),

    #[error("Crop {rect:?} has no area inside a {width}x{height} frame")]
    CropOutOfBounds { rect: Rect, width: u32, height: u32 },

    #[error("Failed to load logo template {path:?}: {source}")]
    TemplateLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Logo template {path:?} has too few keypoints to match against")]
    TemplateFeatures { path: PathBuf },
}
