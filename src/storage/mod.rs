//! Storage module for persisting crawl data
//!
//! This module handles the two files a crawl keeps on disk:
//! - The metadata file: per-URL records, run statistics, last crawl time
//! - The session recovery file: the frontier of an unfinished run
//!
//! Both are JSON documents replaced atomically on every save.

mod metadata;
mod session;
mod statistics;
mod traits;

pub use metadata::{
    load_metadata, pages_by_framework, save_metadata, CrawlMetadata, MetadataStore, PageMetadata,
};
pub use session::SessionState;
pub use statistics::CrawlStatistics;
pub use traits::{same_location, write_atomic, JsonDocument, StorageError, StorageResult};
