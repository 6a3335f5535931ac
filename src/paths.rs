use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::calibration::Resolution;

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

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the default config location: `<exe_dir>/config.json`
pub fn default_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the default data directory: `<local data>/autotents/`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autotents")
}

/// Returns the calibration store: `<data_dir>/preset.json`
pub fn preset_path(data_dir: &Path) -> PathBuf {
    data_dir.join("preset.json")
}

/// Returns the corpus store: `<data_dir>/digits/`
pub fn digits_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("digits")
}

/// Returns the screenshot directory for one resolution: `<data_dir>/samples/<h>x<w>/`
pub fn samples_dir(data_dir: &Path, resolution: Resolution) -> PathBuf {
    data_dir.join("samples").join(resolution.key())
}

/// Returns the calibration screenshot for one board size.
pub fn calibration_sample_path(data_dir: &Path, resolution: Resolution, size: usize) -> PathBuf {
    samples_dir(data_dir, resolution).join(format!("sample-{}x{}.png", size, size))
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories(data_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(digits_dir(data_dir))?;
    Ok(())
}
