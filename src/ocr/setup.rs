use anyhow::{Result, anyhow};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::paths;

/// Language pack every OCR call relies on.
const LANGUAGE_FILE: &str = "eng.traineddata";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets Tesseract use its compiled-in tessdata location.
    pub tessdata: Option<PathBuf>,
}

/// Finds the Tesseract executable and its tessdata directory.
///
/// Explicit paths win. Otherwise the per-user install directory is checked,
/// then `PATH`, then the usual install locations.
pub fn locate_tesseract(
    executable: Option<&Path>,
    tessdata: Option<&Path>,
) -> Result<TesseractPaths> {
    let executable = match executable {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => {
            return Err(anyhow!(
                "Configured Tesseract executable does not exist: {}",
                path.display()
            ));
        }
        None => find_tesseract_executable()?,
    };

    let tessdata = match tessdata {
        Some(path) if path.join(LANGUAGE_FILE).exists() => Some(path.to_path_buf()),
        Some(path) => {
            return Err(anyhow!(
                "Configured tessdata directory has no {}: {}",
                LANGUAGE_FILE,
                path.display()
            ));
        }
        None => find_tessdata_dir(),
    };

    info!(
        "Using Tesseract at {} (tessdata: {})",
        executable.display(),
        tessdata
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable, checking our local dir first, then system
fn find_tesseract_executable() -> Result<PathBuf> {
    let tesseract_dir = paths::get_tesseract_dir();
    for name in ["tesseract", "tesseract.exe"] {
        let local_exe = tesseract_dir.join(name);
        if local_exe.exists() {
            return Ok(local_exe);
        }
    }

    // Check PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output()
        && output.status.success()
    {
        return Ok(PathBuf::from("tesseract"));
    }

    let common_paths = [
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    ];

    for path in &common_paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds the tessdata directory, or `None` to defer to Tesseract's default.
fn find_tessdata_dir() -> Option<PathBuf> {
    let local_tessdata = paths::get_tesseract_dir().join("tessdata");
    if local_tessdata.join(LANGUAGE_FILE).exists() {
        return Some(local_tessdata);
    }

    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join(LANGUAGE_FILE).exists() {
            return Some(p);
        }
        let p = p.join("tessdata");
        if p.join(LANGUAGE_FILE).exists() {
            return Some(p);
        }
    }

    debug!("No tessdata override found, using Tesseract's default");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_paths_are_used() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("tesseract");
        std::fs::write(&exe, "").unwrap();
        std::fs::write(dir.path().join(LANGUAGE_FILE), "").unwrap();

        let paths = locate_tesseract(Some(&exe), Some(dir.path())).unwrap();
        assert_eq!(paths.executable, exe);
        assert_eq!(paths.tessdata.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_missing_explicit_executable_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(locate_tesseract(Some(&missing), None).is_err());
    }

    #[test]
    fn test_tessdata_without_language_pack_is_an_error() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("tesseract");
        std::fs::write(&exe, "").unwrap();
        assert!(locate_tesseract(Some(&exe), Some(dir.path())).is_err());
    }
}
