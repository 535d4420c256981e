use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use super::{OcrMode, TextRecognizer};

/// Runs the Tesseract command-line tool once per crop.
///
/// Each call spawns its own child process and temp file, so nothing about
/// the OCR backend is shared between callers.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    paths: TesseractPaths,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths) -> Self {
        Self { paths }
    }

    fn mode_args(mode: OcrMode) -> &'static [&'static str] {
        match mode {
            OcrMode::Digits => &["--psm", "6", "digits"],
            OcrMode::Text => &["--psm", "3"],
        }
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, image: &DynamicImage, mode: OcrMode) -> Result<String> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .context("Failed to write OCR input image")?;

        let mut command = Command::new(&self.paths.executable);
        command.arg(temp_input.path()).arg("stdout");
        if let Some(tessdata) = &self.paths.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        // Config file names such as `digits` must come last
        command.arg("-l").arg("eng").args(Self::mode_args(mode));

        let output = command.output().with_context(|| {
            format!(
                "Failed to run Tesseract at {}",
                self.paths.executable.display()
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_digit_mode_ends_with_config_name() {
        assert_eq!(TesseractEngine::mode_args(OcrMode::Digits).last(), Some(&"digits"));
        assert_eq!(TesseractEngine::mode_args(OcrMode::Text), &["--psm", "3"]);
    }

    #[test]
    fn test_missing_executable_is_an_error() {
        let engine = TesseractEngine::new(TesseractPaths {
            executable: PathBuf::from("/definitely/not/tesseract"),
            tessdata: None,
        });
        let img = DynamicImage::new_luma8(4, 4);
        assert!(engine.recognize(&img, OcrMode::Text).is_err());
    }
}
