//! Batch Processing Module
//!
//! Source file collection for a conversion batch plus the outcome counters
//! the batch reports at the end.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source extensions accepted by directory scans (compared case-insensitively).
pub const WEBP_SOURCE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Collect non-directory entries under `dir` whose extension is in `extensions`.
///
/// Non-recursive mode only looks at direct children. Recursive mode walks the
/// whole subtree. Entries are visited in file-name order within each
/// directory, so repeated scans of an unchanged tree give the same sequence.
///
/// Any read error (including an unreadable or missing `dir`) aborts the scan;
/// an empty result is not an error.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> io::Result<Vec<PathBuf>> {
    let root = std::path::absolute(dir)?;
    if !std::fs::metadata(&root)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a directory: {}", root.display()),
        ));
    }

    let walker = if recursive {
        WalkDir::new(&root).min_depth(1)
    } else {
        WalkDir::new(&root).min_depth(1).max_depth(1)
    };

    let mut files = Vec::new();
    for entry in walker.sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        // Symlinks are not followed, so a link to an image reports as a link.
        if entry.file_type().is_dir() {
            continue;
        }
        if crate::common_utils::has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Converted/failed totals for one batch.
///
/// `total()` is always `converted + failed`; after a batch drains it equals the
/// number of dispatched jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounters {
    pub converted: usize,
    pub failed: usize,
}

impl OutcomeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.converted += 1;
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> usize {
        self.converted + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            100.0
        } else {
            (self.converted as f64 / self.total() as f64) * 100.0
        }
    }
}
