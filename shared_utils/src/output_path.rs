//! Output path resolution
//!
//! Picks `dir/base.ext`, or the first free `dir/base-N.ext`, checked against the
//! filesystem at call time. The check-then-create window is not atomic across
//! processes; within one process callers pass an `is_claimed` predicate backed
//! by their own claimed-name set.

use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on numeric suffixes tried before falling back to a timestamp.
pub const MAX_SUFFIX_ATTEMPTS: u32 = 1_000_000;

fn file_name(base: &str, suffix: Option<&str>, ext: &str) -> String {
    let stem = match suffix {
        Some(s) => format!("{}-{}", base, s),
        None => base.to_string(),
    };
    if ext.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, ext)
    }
}

/// A path counts as taken only when its metadata can be read. Any lookup error
/// (missing, parent is not a directory, no permission) leaves it free; a path
/// that cannot really be written fails later at write time.
fn exists_on_disk(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

/// Resolve a collision-free output path, additionally skipping any candidate
/// for which `is_claimed` returns true.
pub fn resolve_unique_path_with<F>(dir: &Path, base: &str, ext: &str, is_claimed: F) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    resolve_bounded(dir, base, ext, MAX_SUFFIX_ATTEMPTS, is_claimed)
}

fn resolve_bounded<F>(dir: &Path, base: &str, ext: &str, max_suffix: u32, mut is_claimed: F) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    let mut is_taken = |p: &Path| exists_on_disk(p) || is_claimed(p);

    let candidate = dir.join(file_name(base, None, ext));
    if !is_taken(&candidate) {
        return candidate;
    }

    for i in 1..max_suffix {
        let candidate = dir.join(file_name(base, Some(&i.to_string()), ext));
        if !is_taken(&candidate) {
            return candidate;
        }
    }

    let stamp = chrono::Utc::now().timestamp().to_string();
    tracing::warn!(
        dir = ?dir,
        base = base,
        "Numeric suffixes exhausted, falling back to timestamp name"
    );
    dir.join(file_name(base, Some(&stamp), ext))
}
