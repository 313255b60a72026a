//! Session checkpoints
//!
//! Periodically writes the frontier to the session recovery file so an
//! interrupted crawl can pick up where it stopped. Losing a checkpoint only
//! means redoing some pages, so failed automatic saves are logged and tried
//! again on the next tick.

use crate::crawler::QueuedUrl;
use crate::storage::{JsonDocument, SessionState, StorageResult};
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Owns the session recovery file
#[derive(Debug)]
pub struct CheckpointManager {
    path: PathBuf,
    interval: Duration,
    /// Time of the last successful save
    last_save: Option<Instant>,
}

impl CheckpointManager {
    /// Creates a manager for `path` that auto-saves at most once per `interval`
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last_save: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the session file unconditionally
    pub fn save_session_state(
        &mut self,
        visited: &HashSet<String>,
        queue: &[QueuedUrl],
        start_url: &str,
        output_directory: &Path,
    ) -> StorageResult<()> {
        let state = SessionState {
            visited: visited.clone(),
            queue: queue.to_vec(),
            start_url: start_url.to_string(),
            output_directory: output_directory.to_path_buf(),
            saved_at: Utc::now(),
        };

        state.write_to(&self.path)?;
        self.last_save = Some(Instant::now());

        tracing::debug!(
            "Checkpoint saved: {} visited, {} queued",
            visited.len(),
            queue.len()
        );
        Ok(())
    }

    /// Writes the session file if the interval since the last save elapsed
    ///
    /// # Returns
    ///
    /// `true` if a checkpoint was written. A failed write is logged and
    /// reported as `false`; the next call tries again.
    pub fn auto_save_if_needed(
        &mut self,
        visited: &HashSet<String>,
        queue: &[QueuedUrl],
        start_url: &str,
        output_directory: &Path,
    ) -> bool {
        if !self.is_due() {
            return false;
        }

        match self.save_session_state(visited, queue, start_url, output_directory) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Failed to write checkpoint {}: {} (will retry)",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }

    /// True when the next `auto_save_if_needed` call would write
    pub fn is_due(&self) -> bool {
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// True if a session file exists
    pub fn has_active_session(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the saved session, if any
    pub fn get_saved_session(&self) -> StorageResult<Option<SessionState>> {
        SessionState::read_from(&self.path)
    }

    /// Deletes the session file; a missing file is not an error
    pub fn clear_session_state(&mut self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Cleared session file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
