//! Crawler module for page fetching and processing
//!
//! This module contains the incremental crawl engine, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML to text transformation and link extraction behind `Transformer`
//! - The breadth-first frontier with scope, depth and page limits
//! - Content-hash change detection
//! - Session checkpoints for resumable runs
//! - Overall crawl coordination

mod change;
mod checkpoint;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use change::{ChangeDetector, RecrawlReason};
pub use checkpoint::CheckpointManager;
pub use coordinator::{crawl, crawl_until, Coordinator};
pub use fetcher::{build_http_client, user_agent_string, FetchError, Fetcher, HttpFetcher};
pub use parser::{parse_html, HtmlTransformer, TransformedPage, Transformer};
pub use scheduler::{EnqueueOutcome, Frontier, QueuedUrl};
