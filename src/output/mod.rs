//! Output module for crawl reports
//!
//! This module handles:
//! - Printing run statistics to the terminal
//! - Generating markdown summaries of the mirror from its metadata file

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{change_rate, format_duration, format_statistics, print_statistics};

use crate::storage::{CrawlMetadata, JsonDocument, StorageError};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No crawl metadata found at {0}")]
    NoData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Loads the metadata file a report is built from
///
/// Unlike the crawler, which starts from empty metadata, a report needs an
/// existing file.
///
/// # Returns
///
/// * `Ok(CrawlMetadata)` - The parsed metadata
/// * `Err(OutputError::NoData)` - No metadata file at `path`
/// * `Err(OutputError::Storage)` - The file is unreadable or corrupt
pub fn load_report_metadata(path: &Path) -> OutputResult<CrawlMetadata> {
    CrawlMetadata::read_from(path)?
        .ok_or_else(|| OutputError::NoData(path.display().to_string()))
}
