//! Output root setup
//!
//! `<downloads>/webp-YYYYMMDD-HHMMSS/` plus `webp-errors.log` inside it, both
//! created before any job is dispatched.

use chrono::{DateTime, Local};
use shared_utils::SetupError;
use std::fs;
use std::path::{Path, PathBuf};

pub const ERROR_LOG_NAME: &str = "webp-errors.log";
pub const OUTPUT_FOLDER_PREFIX: &str = "webp-";

/// The platform downloads folder, else `<home>/Downloads`, else the current
/// directory.
pub fn downloads_dir() -> PathBuf {
    downloads_dir_from(
        dirs_next::download_dir(),
        dirs_next::home_dir(),
        std::env::current_dir().ok(),
    )
}

fn downloads_dir_from(
    downloads: Option<PathBuf>,
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
) -> PathBuf {
    let non_empty = |p: &PathBuf| !p.as_os_str().is_empty();
    downloads
        .filter(non_empty)
        .or_else(|| home.filter(non_empty).map(|h| h.join("Downloads")))
        .or(cwd)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn output_folder_name(now: DateTime<Local>) -> String {
    format!("{}{}", OUTPUT_FOLDER_PREFIX, now.format("%Y%m%d-%H%M%S"))
}

/// Create `parent/webp-<timestamp>` (parents included) and return it.
pub fn create_output_folder(parent: &Path) -> Result<PathBuf, SetupError> {
    let folder = parent.join(output_folder_name(Local::now()));
    fs::create_dir_all(&folder).map_err(|source| SetupError::OutputSetup {
        path: folder.clone(),
        source,
    })?;
    Ok(folder)
}

pub fn error_log_path(output_dir: &Path) -> PathBuf {
    output_dir.join(ERROR_LOG_NAME)
}
