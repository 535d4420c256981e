//! Numbered frame images on disk.

use anyhow::{Context, Result, anyhow};
use image::RgbImage;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::harness::record::FrameError;

/// One frame image and the index embedded in its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    pub index: u64,
    pub path: PathBuf,
}

impl FrameEntry {
    /// Decodes the frame as RGB.
    pub fn load(&self) -> Result<RgbImage, FrameError> {
        image::open(&self.path)
            .map(|img| img.to_rgb8())
            .map_err(|source| FrameError::Open {
                path: self.path.clone(),
                source,
            })
    }
}

/// Concatenates every ASCII digit in `name`, so `frame0649.jpg` is 649.
/// Returns `None` when there are no digits or the number overflows.
pub fn extract_frame_index(name: &str) -> Option<u64> {
    let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Lists the frames in `dir` whose index lies in `start..=end`, sorted by
/// index and then by name.
///
/// Hidden entries, directories, dangling links and names without digits
/// are skipped.
pub fn list_frames(dir: &Path, start: u64, end: u64) -> Result<Vec<FrameEntry>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read frame directory {}", dir.display()))?;

    let mut frames = Vec::new();
    for entry in entries {
        let entry = entry?;
        // Follows symlinks, so linked-in frames count as files.
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            debug!("Skipping non-UTF-8 file name {:?}", name);
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let Some(index) = extract_frame_index(name) else {
            debug!("Skipping {} (no frame index)", name);
            continue;
        };
        if (start..=end).contains(&index) {
            frames.push(FrameEntry {
                index,
                path: entry.path(),
            });
        }
    }

    frames.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));
    info!(
        "Found {} frames in {} (range {}..={})",
        frames.len(),
        dir.display(),
        start,
        end
    );
    Ok(frames)
}

/// Decodes the first frame to learn the session's dimensions. Fails when
/// there are no frames or the first one cannot be read.
pub fn session_dimensions(frames: &[FrameEntry]) -> Result<(u32, u32)> {
    let first = frames
        .first()
        .ok_or_else(|| anyhow!("No frames to process"))?;
    let image = first
        .load()
        .with_context(|| format!("Cannot read first frame {}", first.index))?;
    Ok(image.dimensions())
}
