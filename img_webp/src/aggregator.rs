//! Outcome aggregation shared by all workers
//!
//! One mutex guards the counters, the claimed output names and the error log
//! file, so a failure's counter increment and its log line form one critical
//! section and a claimed name can never be handed out twice in this process.

use chrono::Local;
use shared_utils::{resolve_unique_path_with, JobError, OutcomeCounters, SetupError};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Append-only failure log, one `YYYY/MM/DD HH:MM:SS message` line per entry.
pub struct ErrorLog {
    path: PathBuf,
    file: File,
}

impl ErrorLog {
    /// Create (or truncate) the log file.
    pub fn create(path: &Path) -> Result<Self, SetupError> {
        let file = File::create(path).map_err(|source| SetupError::ErrorLog {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one entry with a single `write_all`, so a line is never split.
    fn append(&mut self, message: &str) -> io::Result<()> {
        let line = format_log_line(&Local::now().format("%Y/%m/%d %H:%M:%S").to_string(), message);
        self.file.write_all(line.as_bytes())?;
        self.file.flush()
    }
}

/// Newlines in the message are flattened so every entry stays one line.
fn format_log_line(timestamp: &str, message: &str) -> String {
    let flat: String = message
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!("{} {}\n", timestamp, flat)
}

struct OutcomeState {
    counters: OutcomeCounters,
    claimed: HashSet<PathBuf>,
    log: ErrorLog,
}

pub struct OutcomeAggregator {
    state: Mutex<OutcomeState>,
}

impl OutcomeAggregator {
    pub fn new(log: ErrorLog) -> Self {
        Self {
            state: Mutex::new(OutcomeState {
                counters: OutcomeCounters::new(),
                claimed: HashSet::new(),
                log,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OutcomeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record_success(&self) {
        self.lock().counters.success();
    }

    /// Count the failure and append it to the error log.
    ///
    /// A log write error is reported through tracing; the failure is still
    /// counted.
    pub fn record_failure(&self, error: &JobError) {
        let mut state = self.lock();
        state.counters.fail();
        if let Err(e) = state.log.append(&error.to_string()) {
            tracing::error!(
                log = ?state.log.path(),
                error = %e,
                job_error = %error,
                "Failed to append to error log"
            );
        }
    }

    pub fn snapshot(&self) -> OutcomeCounters {
        self.lock().counters
    }

    /// Resolve a free output path for `base.ext` in `dir` and claim it.
    ///
    /// Names claimed earlier in this batch are skipped even if their file has
    /// not been written yet. Other processes writing into `dir` can still race.
    pub fn claim_output_path(&self, dir: &Path, base: &str, ext: &str) -> PathBuf {
        let mut state = self.lock();
        let path = resolve_unique_path_with(dir, base, ext, |p| state.claimed.contains(p));
        state.claimed.insert(path.clone());
        path
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.lock().log.path().to_path_buf()
    }
}
