//! Harness configuration.
//!
//! Read from a JSON file at startup. Every field has a default, so a
//! partial file or no file at all is fine.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// First frame index to analyse (inclusive)
    pub start_frame: u64,
    /// Last frame index to analyse (inclusive)
    pub end_frame: u64,
    /// Split the frames across worker threads
    pub parallel: bool,
    /// Frames per work unit in parallel mode
    pub chunk_size: usize,
    /// Worker threads in parallel mode; `None` uses all cores but one
    pub workers: Option<usize>,
    /// Logo image used to find the overlay when the label text is unreadable
    pub logo_template: PathBuf,
    /// Tesseract executable; `None` searches for it
    pub tesseract_path: Option<PathBuf>,
    /// Directory holding `eng.traineddata`; `None` searches for it
    pub tessdata_dir: Option<PathBuf>,
    /// Also read scores, timeout and match period on game frames
    pub advanced_scraping: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            start_frame: 0,
            end_frame: u64::MAX,
            parallel: false,
            chunk_size: 10,
            workers: None,
            logo_template: paths::default_logo_template(),
            tesseract_path: None,
            tessdata_dir: None,
            advanced_scraping: false,
        }
    }
}

impl HarnessConfig {
    /// Loads the configuration, falling back to defaults when the file is
    /// missing or broken.
    pub fn load(path: &Path) -> Self {
        info!("Looking for config at: {}", path.display());

        if !path.exists() {
            info!("{} not found. Using default config.", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1)
    }
}
