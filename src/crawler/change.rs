//! Change detection
//!
//! Decides per page whether a fetched document has to be written again.

use crate::config::CrawlConfig;
use crate::storage::{same_location, MetadataStore, PageMetadata};
use std::fmt;
use std::path::Path;

/// Result of a change check, in decision order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecrawlReason {
    /// Change detection is switched off
    Disabled,
    /// Force-recrawl is set
    Forced,
    /// No record exists for the URL
    NewPage,
    /// The recorded artifact is gone from disk
    MissingArtifact,
    /// The content hash differs from the stored one
    ContentChanged,
    /// Same hash, artifact present
    Unchanged,
}

impl RecrawlReason {
    pub fn should_recrawl(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for RecrawlReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "change detection disabled",
            Self::Forced => "forced",
            Self::NewPage => "new page",
            Self::MissingArtifact => "artifact missing",
            Self::ContentChanged => "content changed",
            Self::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Change detector configured for one run
#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    enabled: bool,
    force: bool,
}

impl ChangeDetector {
    pub fn new(enabled: bool, force: bool) -> Self {
        Self { enabled, force }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.change_detection, config.force_recrawl)
    }

    /// Decides whether `url` must be saved again
    pub fn should_recrawl(
        &self,
        store: &MetadataStore,
        url: &str,
        new_content_hash: &str,
        artifact_path: &Path,
    ) -> bool {
        self.evaluate(store.page(url), new_content_hash, artifact_path)
            .should_recrawl()
    }

    /// Classifies a page against its previous record
    ///
    /// The force and missing-artifact checks come before the hash
    /// comparison: a deleted local file with unchanged remote content must
    /// still be written again.
    pub fn evaluate(
        &self,
        previous: Option<&PageMetadata>,
        new_content_hash: &str,
        artifact_path: &Path,
    ) -> RecrawlReason {
        if !self.enabled {
            return RecrawlReason::Disabled;
        }

        if self.force {
            return RecrawlReason::Forced;
        }

        let Some(previous) = previous else {
            return RecrawlReason::NewPage;
        };

        if !artifact_path.is_file() || !same_location(&previous.file_path, artifact_path) {
            return RecrawlReason::MissingArtifact;
        }

        if previous.content_hash != new_content_hash {
            return RecrawlReason::ContentChanged;
        }

        RecrawlReason::Unchanged
    }
}
