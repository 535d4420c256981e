use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the resources directory: `<exe_dir>/resources/`
pub fn get_resources_dir() -> PathBuf {
    get_exe_dir().join("resources")
}

/// Returns the bundled logo template: `<exe_dir>/resources/first-logo.bmp`
pub fn default_logo_template() -> PathBuf {
    get_resources_dir().join("first-logo.bmp")
}

/// Returns the default config file: `<exe_dir>/config.json`
pub fn default_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the per-user Tesseract install directory:
/// `<local data dir>/match-observer/tesseract/`, or `<exe_dir>/tesseract/`
/// when the platform has no local data directory.
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("match-observer"))
        .unwrap_or_else(|| get_exe_dir().clone())
        .join("tesseract")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_live_next_to_executable() {
        assert!(default_logo_template().starts_with(get_exe_dir()));
        assert_eq!(default_config_path().file_name().unwrap(), "config.json");
        assert!(get_tesseract_dir().ends_with("tesseract"));
    }
}
