//! Run statistics
//!
//! Counters for one crawl run, persisted inside the metadata file.

use crate::state::PageOutcome;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one crawl run
///
/// `end_time` stays unset while a run is in progress, so a persisted
/// snapshot without it belongs to a run that never finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatistics {
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub new_pages: u64,
    #[serde(default)]
    pub updated_pages: u64,
    #[serde(default)]
    pub skipped_pages: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl CrawlStatistics {
    /// Zeroed counters for a run starting now
    pub fn started_now() -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Counts one page outcome
    pub fn record(&mut self, outcome: PageOutcome) {
        self.total_pages += 1;
        match outcome {
            PageOutcome::New => self.new_pages += 1,
            PageOutcome::Updated => self.updated_pages += 1,
            PageOutcome::Skipped => self.skipped_pages += 1,
            PageOutcome::Error => self.errors += 1,
        }
    }

    /// True for a run that started and has not been finalized
    pub fn is_in_progress(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none()
    }

    /// Wall-clock duration of a finished run
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Pages written during the run (new plus updated)
    pub fn changed_pages(&self) -> u64 {
        self.new_pages + self.updated_pages
    }
}
