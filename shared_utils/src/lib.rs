//! Shared Utilities for the img-webp batch converter
//!
//! This crate provides the domain-neutral pieces the converter binary builds on:
//! - Source file collection (extension filter, optional recursion)
//! - File name sanitization and extension helpers
//! - Collision-free output path resolution
//! - Progress bar + channel-backed progress reporter
//! - Summary reporting
//! - Unified logging (tracing)
//! - Shared error taxonomy

pub mod batch;
pub mod common_utils;
pub mod img_errors;
pub mod logging;
pub mod output_path;
pub mod progress;
pub mod report;

pub use batch::{collect_files, OutcomeCounters, WEBP_SOURCE_EXTENSIONS};
pub use common_utils::{get_extension_lowercase, has_extension, sanitize_file_name};
pub use img_errors::{JobError, JobErrorKind, SetupError};
pub use output_path::{resolve_unique_path_with, MAX_SUFFIX_ATTEMPTS};
pub use progress::{
    create_progress_bar, format_duration, spawn_progress_reporter, ProgressHandle,
    ProgressReporter,
};
pub use report::{print_simple_summary, print_summary_report, summary_line};
