//! Shared Image Conversion Error Types
//!
//! Two tiers:
//! - [`SetupError`]: fatal, raised before any job is dispatched.
//! - [`JobError`]: per-job, recorded and counted, never fatal to the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while preparing a batch.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Error reading directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error creating output folder {}: {source}", .path.display())]
    OutputSetup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create error log file {}: {source}", .path.display())]
    ErrorLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create worker pool: {0}")]
    WorkerPool(String),
}

/// Which stage a job failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobErrorKind {
    Fetch,
    Decode,
    Encode,
    Write,
    /// Worker panicked; the stage is unknown.
    Panic,
}

/// Per-job failure. The message always names the job (path or URL) and the
/// underlying cause, so one log line is enough to diagnose it.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("open file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("download {url}: {cause}")]
    Download { url: String, cause: String },

    #[error("invalid response {url}: {status}")]
    HttpStatus { url: String, status: String },

    #[error("decode {target}: {cause}")]
    Decode { target: String, cause: String },

    #[error("encode {}: {cause}", .path.display())]
    Encode { path: PathBuf, cause: String },

    #[error("create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("worker panicked on {target}: {cause}")]
    Panicked { target: String, cause: String },
}

impl JobError {
    pub fn kind(&self) -> JobErrorKind {
        match self {
            JobError::Open { .. } | JobError::Download { .. } | JobError::HttpStatus { .. } => {
                JobErrorKind::Fetch
            }
            JobError::Decode { .. } => JobErrorKind::Decode,
            JobError::Encode { .. } => JobErrorKind::Encode,
            JobError::CreateDir { .. } | JobError::Write { .. } => JobErrorKind::Write,
            JobError::Panicked { .. } => JobErrorKind::Panic,
        }
    }
}
