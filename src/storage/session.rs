//! Session recovery file
//!
//! The frontier of an unfinished run, saved so the next run can pick up
//! where this one stopped.

use crate::crawler::QueuedUrl;
use crate::storage::traits::{same_location, JsonDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Snapshot of an in-progress crawl's frontier
///
/// Written to the session recovery file at every checkpoint and removed
/// when a run finishes normally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// URLs already dequeued in this run
    pub visited: HashSet<String>,
    /// Pending work, head first
    pub queue: Vec<QueuedUrl>,
    #[serde(rename = "startURL")]
    pub start_url: String,
    pub output_directory: PathBuf,
    pub saved_at: DateTime<Utc>,
}

impl JsonDocument for SessionState {}

impl SessionState {
    /// True when this session was started with the same root and output
    ///
    /// Directories match when they resolve to the same place on disk.
    pub fn matches(&self, start_url: &str, output_directory: &Path) -> bool {
        self.start_url == start_url && same_location(&self.output_directory, output_directory)
    }

    /// Number of URLs that were enqueued in the session so far
    pub fn enqueued_count(&self) -> usize {
        self.visited.len() + self.queue.len()
    }
}
