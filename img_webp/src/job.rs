//! Conversion jobs and the job source
//!
//! A batch is assembled once, up front: local files from an optional directory
//! scan, then URLs from an optional comma-separated list.

use shared_utils::{collect_files, sanitize_file_name, SetupError, WEBP_SOURCE_EXTENSIONS};
use std::fmt;
use std::path::{Path, PathBuf};

/// One unit of conversion work. Consumed exactly once by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    LocalFile(PathBuf),
    RemoteUrl(String),
}

impl Job {
    /// Base name (no extension) the output file is derived from.
    ///
    /// Local files keep their stem as-is; URL names are sanitized since they
    /// come from arbitrary remote paths.
    pub fn output_base_name(&self) -> String {
        match self {
            Job::LocalFile(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "file".to_string()),
            Job::RemoteUrl(url) => sanitize_file_name(strip_extension(url_last_segment(url))),
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Job::RemoteUrl(_))
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::LocalFile(path) => write!(f, "{}", path.display()),
            Job::RemoteUrl(url) => f.write_str(url),
        }
    }
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
fn url_last_segment(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = url[..end].trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) => &name[..i],
        None => name,
    }
}

/// Options shared read-only by every worker for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Lossy quality, 1..=100.
    pub quality: u8,
    /// Force lossless encoding for every source.
    pub lossless: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            lossless: false,
        }
    }
}

/// Split a comma-separated URL list into jobs.
///
/// Entries are trimmed and empty ones dropped. Nothing is validated here;
/// bad URLs fail at fetch time.
pub fn parse_url_list(urls: &str) -> Vec<Job> {
    urls.split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| Job::RemoteUrl(u.to_string()))
        .collect()
}

/// Assemble the batch: directory files first, then URLs.
///
/// Fails only when the directory cannot be read. Zero jobs is a valid result;
/// the caller decides whether that ends the run.
pub fn collect_jobs(dir: Option<&Path>, recursive: bool, urls: Option<&str>) -> Result<Vec<Job>, SetupError> {
    let mut jobs = Vec::new();

    if let Some(dir) = dir {
        let files = collect_files(dir, WEBP_SOURCE_EXTENSIONS, recursive).map_err(|source| {
            SetupError::DirectoryRead {
                path: dir.to_path_buf(),
                source,
            }
        })?;
        tracing::debug!(dir = ?dir, recursive, count = files.len(), "Collected local files");
        jobs.extend(files.into_iter().map(Job::LocalFile));
    }

    if let Some(urls) = urls {
        let url_jobs = parse_url_list(urls);
        tracing::debug!(count = url_jobs.len(), "Collected URLs");
        jobs.extend(url_jobs);
    }

    Ok(jobs)
}
