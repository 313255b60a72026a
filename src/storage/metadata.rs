//! Persistent per-URL metadata
//!
//! The metadata file is the only memory the crawler has between runs: it
//! tells the change detector which pages exist locally and what their content
//! hash was when they were saved.

use crate::storage::statistics::CrawlStatistics;
use crate::storage::traits::{JsonDocument, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// What is known about one previously saved page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub url: String,
    pub framework: String,
    pub file_path: PathBuf,
    /// Hash of the most recently saved artifact
    pub content_hash: String,
    /// BFS depth at first discovery
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_crawled: Option<DateTime<Utc>>,
}

/// The persisted aggregate: pages, statistics and last finished crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlMetadata {
    #[serde(default)]
    pub pages: HashMap<String, PageMetadata>,
    #[serde(default)]
    pub stats: CrawlStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_crawl: Option<DateTime<Utc>>,
}

impl JsonDocument for CrawlMetadata {}

/// Loads metadata from `path`
///
/// A missing file yields empty metadata. A file that exists but cannot be
/// parsed is an error: resetting it would re-fetch the whole tree.
pub fn load_metadata(path: &Path) -> StorageResult<CrawlMetadata> {
    Ok(CrawlMetadata::read_from(path)?.unwrap_or_default())
}

/// Atomically writes `metadata` to `path`
pub fn save_metadata(metadata: &CrawlMetadata, path: &Path) -> StorageResult<()> {
    metadata.write_to(path)
}

/// In-memory metadata bound to the file it is saved to
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    metadata: CrawlMetadata,
}

impl MetadataStore {
    /// Opens the store backed by `path`
    ///
    /// # Returns
    ///
    /// * `Ok(MetadataStore)` - Loaded (or empty, if the file is absent)
    /// * `Err(StorageError::Corrupt)` - The existing file is unreadable
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let metadata = load_metadata(&path)?;
        tracing::debug!(
            "Loaded metadata for {} pages from {}",
            metadata.pages.len(),
            path.display()
        );
        Ok(Self { path, metadata })
    }

    /// Writes the whole store to its file
    pub fn save(&self) -> StorageResult<()> {
        save_metadata(&self.metadata, &self.path)
    }

    /// Inserts or replaces the record for `url`
    pub fn upsert_page(
        &mut self,
        url: &str,
        framework: &str,
        file_path: &Path,
        content_hash: &str,
        depth: u32,
    ) {
        self.metadata.pages.insert(
            url.to_string(),
            PageMetadata {
                url: url.to_string(),
                framework: framework.to_string(),
                file_path: file_path.to_path_buf(),
                content_hash: content_hash.to_string(),
                depth,
                last_crawled: Some(Utc::now()),
            },
        );
    }

    /// Looks up the record for `url`
    pub fn page(&self, url: &str) -> Option<&PageMetadata> {
        self.metadata.pages.get(url)
    }

    pub fn page_count(&self) -> usize {
        self.metadata.pages.len()
    }

    /// Applies `mutator` to the run statistics
    pub fn update_statistics<F>(&mut self, mutator: F)
    where
        F: FnOnce(&mut CrawlStatistics),
    {
        mutator(&mut self.metadata.stats);
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.metadata.stats
    }

    pub fn metadata(&self) -> &CrawlMetadata {
        &self.metadata
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepares statistics for a run
    ///
    /// A resumed run keeps counting from the persisted snapshot when that
    /// snapshot belongs to the interrupted run; otherwise counters restart.
    pub fn begin_run(&mut self, resume: bool) {
        if resume && self.metadata.stats.is_in_progress() {
            tracing::info!(
                "Continuing statistics of interrupted run ({} pages so far)",
                self.metadata.stats.total_pages
            );
        } else {
            self.metadata.stats = CrawlStatistics::started_now();
        }
    }

    /// Stamps the end of the run and returns the final statistics
    pub fn finalize_run(&mut self) -> CrawlStatistics {
        let now = Utc::now();
        self.metadata.stats.end_time = Some(now);
        self.metadata.last_crawl = Some(now);
        self.metadata.stats.clone()
    }

    /// Number of pages per framework tag, sorted by tag
    pub fn pages_by_framework(&self) -> BTreeMap<String, usize> {
        pages_by_framework(&self.metadata)
    }
}

/// Number of pages per framework tag, sorted by tag
pub fn pages_by_framework(metadata: &CrawlMetadata) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for page in metadata.pages.values() {
        *counts.entry(page.framework.clone()).or_insert(0) += 1;
    }
    counts
}
