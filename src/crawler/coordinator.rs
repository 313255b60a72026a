//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator is the single owner of the frontier, the metadata store,
//! the checkpoint manager and the run statistics. Fetching, transforming and
//! hashing happen in a bounded pool of worker tasks; each worker sends back
//! one `PageResult` and the coordinator applies it in one synchronous step:
//! - change detection and artifact write
//! - metadata upsert and counters
//! - link expansion at `depth + 1`
//! - periodic checkpoints
//!
//! A stop signal aborts the workers, puts their URLs back at the head of the
//! frontier and writes a final checkpoint so the next run resumes.

use crate::config::{validate, Config, SessionPolicy};
use crate::crawler::change::ChangeDetector;
use crate::crawler::checkpoint::CheckpointManager;
use crate::crawler::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::crawler::parser::{HtmlTransformer, TransformedPage, Transformer};
use crate::crawler::scheduler::{Frontier, QueuedUrl};
use crate::hash::content_hash;
use crate::state::{PageOutcome, PageState};
use crate::storage::{write_atomic, CrawlStatistics, MetadataStore};
use crate::url::{allowed_prefixes, artifact_path, framework_for, normalize_url};
use crate::{ConfigError, ConfigResult, MirrorError, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use url::Url;

/// Why a worker produced no content for a page
#[derive(Debug, Error)]
enum PageError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("transformer produced no content")]
    NoContent,
}

/// Content a worker extracted from one page
#[derive(Debug)]
struct FetchedPage {
    url: Url,
    page: TransformedPage,
    content_hash: String,
}

/// Message a worker sends back to the coordinator
#[derive(Debug)]
struct PageResult {
    item: QueuedUrl,
    /// Last state the worker reached
    state: PageState,
    outcome: std::result::Result<FetchedPage, PageError>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    transformer: Arc<dyn Transformer>,
    frontier: Frontier,
    store: MetadataStore,
    checkpoints: CheckpointManager,
    detector: ChangeDetector,
    /// Normalized start URL; framework tags are derived relative to it
    root: Url,
    /// URLs handed to workers and not yet applied, keyed by URL with
    /// their dispatch sequence number
    in_flight: HashMap<String, (u64, QueuedUrl)>,
    dispatched: u64,
    shutdown: Option<watch::Receiver<bool>>,
    resumed: bool,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Validates the configuration, makes sure the output directory is
    /// writable, loads the metadata file and decides between resuming a saved
    /// session and seeding the frontier with the start URL.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fetcher` - Source of raw page bytes
    /// * `transformer` - Turns raw bytes into text and links
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError::Config)` - Invalid configuration or unwritable output
    /// * `Err(MirrorError::Storage)` - The metadata file is corrupt or unreadable
    /// * `Err(MirrorError::ResumeConflict)` - A saved session belongs to another crawl
    pub fn new(
        mut config: Config,
        fetcher: Arc<dyn Fetcher>,
        transformer: Arc<dyn Transformer>,
    ) -> Result<Self> {
        validate(&config)?;

        let root = normalize_url(&config.crawl.start_url)?;
        config.crawl.output_directory =
            ensure_output_directory(&config.crawl.output_directory)?;

        let store = MetadataStore::open(config.metadata_path())?;
        tracing::info!(
            "Loaded metadata for {} pages from {}",
            store.page_count(),
            store.path().display()
        );

        let frontier = Frontier::new(
            allowed_prefixes(&config)?,
            config.crawl.max_depth,
            config.crawl.max_pages,
        );
        let checkpoints =
            CheckpointManager::new(config.session_path(), config.checkpoint_interval());
        let detector = ChangeDetector::from_config(&config.crawl);

        let mut coordinator = Self {
            config: Arc::new(config),
            fetcher,
            transformer,
            frontier,
            store,
            checkpoints,
            detector,
            root,
            in_flight: HashMap::new(),
            dispatched: 0,
            shutdown: None,
            resumed: false,
        };

        coordinator.resumed = coordinator.resume_session()?;
        if !coordinator.resumed {
            let seed = coordinator.root.to_string();
            coordinator.frontier.enqueue(&seed, 0);
        }
        coordinator.store.begin_run(coordinator.resumed);

        Ok(coordinator)
    }

    /// Installs a stop signal; the run stops once the channel holds `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// True if this coordinator picked up a saved session
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.store
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        self.store.statistics()
    }

    /// Restores the frontier from the session file when one applies
    ///
    /// # Returns
    ///
    /// `true` if the frontier was restored.
    fn resume_session(&mut self) -> Result<bool> {
        let session = match self.checkpoints.get_saved_session() {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file: {}", e);
                self.checkpoints.clear_session_state()?;
                return Ok(false);
            }
        };

        let crawl = &self.config.crawl;
        if crawl.session_policy == SessionPolicy::Fresh || crawl.force_recrawl {
            tracing::info!(
                "Discarding saved session from {} ({} URLs enqueued)",
                session.saved_at,
                session.enqueued_count()
            );
            self.checkpoints.clear_session_state()?;
            return Ok(false);
        }

        if !session.matches(self.root.as_str(), &crawl.output_directory) {
            return Err(MirrorError::ResumeConflict {
                saved_start_url: session.start_url,
                saved_output_directory: session.output_directory.display().to_string(),
            });
        }

        tracing::info!(
            "Resuming session saved at {}: {} visited, {} queued",
            session.saved_at,
            session.visited.len(),
            session.queue.len()
        );
        self.frontier.restore(session.visited, session.queue);
        Ok(true)
    }

    /// Runs the main crawl loop
    ///
    /// Dispatches queued URLs to at most `concurrency` workers, paced by the
    /// politeness delay, and applies their results until the frontier is
    /// drained or the stop signal fires.
    ///
    /// # Returns
    ///
    /// The run statistics. After a stop signal `end_time` is unset and the
    /// session file is left in place for the next run.
    pub async fn run(&mut self) -> Result<CrawlStatistics> {
        let concurrency = self.config.runtime.concurrency;
        let delay = self.config.politeness_delay();
        let mut shutdown = self.shutdown.clone();
        let mut workers: JoinSet<PageResult> = JoinSet::new();
        let mut last_dispatch: Option<Instant> = None;
        let mut processed: u64 = 0;
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl of {} ({} queued, {} workers)",
            self.root,
            self.frontier.len(),
            concurrency
        );

        loop {
            if stop_requested(&shutdown) {
                return self.interrupt(workers).await;
            }

            while workers.len() < concurrency && !self.frontier.is_empty() {
                if let Some(last) = last_dispatch {
                    let wait = delay.saturating_sub(last.elapsed());
                    if !pause(wait, &mut shutdown).await {
                        return self.interrupt(workers).await;
                    }
                }

                let Some(item) = self.frontier.dequeue() else {
                    break;
                };
                tracing::debug!("Dispatching {} (depth {})", item.url, item.depth);
                self.dispatched += 1;
                self.in_flight
                    .insert(item.url.clone(), (self.dispatched, item.clone()));
                workers.spawn(process_page(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.transformer),
                    item,
                ));
                last_dispatch = Some(Instant::now());
            }

            if workers.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            }

            let joined = tokio::select! {
                joined = workers.join_next() => joined,
                _ = wait_for_stop(&mut shutdown) => continue,
            };

            match joined {
                Some(Ok(result)) => {
                    let url = result.item.url.clone();
                    if let Err(e) = self.apply_result(result) {
                        tracing::warn!("Failed to apply result for {}: {}", url, e);
                        self.record(PageOutcome::Error);
                    }
                }
                Some(Err(e)) if e.is_cancelled() => continue,
                Some(Err(e)) => {
                    tracing::warn!("Worker task failed: {}", e);
                    self.store
                        .update_statistics(|stats| stats.record(PageOutcome::Error));
                }
                None => break,
            }

            processed += 1;
            if processed % 10 == 0 {
                let rate = processed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages processed, {} in frontier, {:.2} pages/sec",
                    processed,
                    self.frontier.len(),
                    rate
                );
            }

            self.checkpoint_if_due();
        }

        self.finish()
    }

    /// Applies one worker result to the frontier, the store and the counters
    ///
    /// An error means the worker reported a state the result cannot move on
    /// from; the caller counts the page as failed and keeps going.
    fn apply_result(&mut self, result: PageResult) -> Result<PageOutcome> {
        let PageResult {
            item,
            state,
            outcome,
        } = result;
        self.in_flight.remove(&item.url);

        let fetched = match outcome {
            Ok(fetched) => fetched,
            Err(e) => {
                state.transition(PageState::Failed)?;
                if matches!(&e, PageError::Fetch(fetch) if fetch.is_gone()) {
                    tracing::warn!("Page gone {}: {}", item.url, e);
                } else {
                    tracing::warn!("Failed to process {}: {}", item.url, e);
                }
                return Ok(self.record(PageOutcome::Error));
            }
        };

        let artifact = artifact_path(&self.config.crawl.output_directory, &fetched.url);
        let previous = self.store.page(&item.url);
        let known = previous.is_some();
        let reason = self
            .detector
            .evaluate(previous, &fetched.content_hash, &artifact);

        if !reason.should_recrawl() {
            state.transition(PageState::Skipped)?;
            tracing::debug!("Skipping {} ({})", item.url, reason);
            if self.config.crawl.expand_unchanged {
                self.enqueue_links(&fetched.page.links, item.depth);
            }
            return Ok(self.record(PageOutcome::Skipped));
        }

        if let Err(e) = write_atomic(&artifact, fetched.page.text.as_bytes()) {
            state.transition(PageState::Failed)?;
            tracing::warn!(
                "Failed to write artifact {} for {}: {}",
                artifact.display(),
                item.url,
                e
            );
            return Ok(self.record(PageOutcome::Error));
        }

        let state = state.transition(PageState::Saved)?;
        let framework = framework_for(&fetched.url, &self.root);
        self.store.upsert_page(
            &item.url,
            &framework,
            &artifact,
            &fetched.content_hash,
            item.depth,
        );
        tracing::debug!("{} {} ({})", state, item.url, reason);

        let added = self.enqueue_links(&fetched.page.links, item.depth);
        tracing::trace!("{} new URLs queued from {}", added, item.url);

        let outcome = if known {
            PageOutcome::Updated
        } else {
            PageOutcome::New
        };
        Ok(self.record(outcome))
    }

    fn record(&mut self, outcome: PageOutcome) -> PageOutcome {
        self.store.update_statistics(|stats| stats.record(outcome));
        outcome
    }

    /// Queues links found on a page at `parent_depth + 1`
    ///
    /// Returns the number of links accepted by the frontier.
    fn enqueue_links(&mut self, links: &[String], parent_depth: u32) -> usize {
        let mut accepted = 0;
        for link in links {
            let normalized = match normalize_url(link) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Failed to normalize URL {}: {}", link, e);
                    continue;
                }
            };

            if self
                .frontier
                .enqueue(normalized.as_str(), parent_depth + 1)
                .is_accepted()
            {
                accepted += 1;
            }
        }
        accepted
    }

    /// Visited set and queue as they should be persisted right now
    ///
    /// In-flight URLs count as pending so a crash never loses them.
    fn session_snapshot(&self) -> (HashSet<String>, Vec<QueuedUrl>) {
        let visited = self
            .frontier
            .visited()
            .iter()
            .filter(|url| !self.in_flight.contains_key(*url))
            .cloned()
            .collect();

        let mut in_flight: Vec<&(u64, QueuedUrl)> = self.in_flight.values().collect();
        in_flight.sort_by_key(|(seq, _)| *seq);
        let mut queue: Vec<QueuedUrl> = in_flight
            .into_iter()
            .map(|(_, item)| item.clone())
            .collect();
        queue.extend(self.frontier.queue_snapshot());

        (visited, queue)
    }

    /// Saves metadata and the session file once the checkpoint interval elapsed
    fn checkpoint_if_due(&mut self) {
        if !self.checkpoints.is_due() {
            return;
        }

        if let Err(e) = self.store.save() {
            tracing::warn!(
                "Failed to save metadata {}: {} (will retry)",
                self.store.path().display(),
                e
            );
        }

        let (visited, queue) = self.session_snapshot();
        self.checkpoints.auto_save_if_needed(
            &visited,
            &queue,
            self.root.as_str(),
            &self.config.crawl.output_directory,
        );
    }

    /// Stops all workers and persists everything needed to resume
    async fn interrupt(&mut self, mut workers: JoinSet<PageResult>) -> Result<CrawlStatistics> {
        tracing::info!(
            "Stop requested, aborting {} in-flight pages",
            self.in_flight.len()
        );
        workers.abort_all();
        while workers.join_next().await.is_some() {}

        // Requeue newest first so the head keeps dispatch order
        let mut pending: Vec<(u64, QueuedUrl)> =
            self.in_flight.drain().map(|(_, entry)| entry).collect();
        pending.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq));
        for (_, item) in pending {
            self.frontier.requeue_front(item);
        }

        self.store.save()?;

        let (visited, queue) = self.session_snapshot();
        if let Err(e) = self.checkpoints.save_session_state(
            &visited,
            &queue,
            self.root.as_str(),
            &self.config.crawl.output_directory,
        ) {
            tracing::warn!(
                "Failed to write final checkpoint {}: {}",
                self.checkpoints.path().display(),
                e
            );
        } else {
            tracing::info!(
                "Progress saved ({} queued); run again to resume",
                queue.len()
            );
        }

        Ok(self.store.statistics().clone())
    }

    /// Stamps the statistics, saves metadata and removes the session file
    fn finish(&mut self) -> Result<CrawlStatistics> {
        let stats = self.store.finalize_run();
        self.store.save()?;

        if let Err(e) = self.checkpoints.clear_session_state() {
            tracing::warn!(
                "Failed to remove session file {}: {}",
                self.checkpoints.path().display(),
                e
            );
        }

        tracing::info!(
            "Crawl finished: {} pages ({} new, {} updated, {} skipped, {} errors)",
            stats.total_pages,
            stats.new_pages,
            stats.updated_pages,
            stats.skipped_pages,
            stats.errors
        );

        Ok(stats)
    }
}

/// Worker body: fetch, transform and hash one page
async fn process_page(
    fetcher: Arc<dyn Fetcher>,
    transformer: Arc<dyn Transformer>,
    item: QueuedUrl,
) -> PageResult {
    let mut state = PageState::Enqueued;
    let outcome =
        fetch_and_transform(fetcher.as_ref(), transformer.as_ref(), &item, &mut state).await;

    PageResult {
        item,
        state,
        outcome,
    }
}

async fn fetch_and_transform(
    fetcher: &dyn Fetcher,
    transformer: &dyn Transformer,
    item: &QueuedUrl,
    state: &mut PageState,
) -> std::result::Result<FetchedPage, PageError> {
    let url = Url::parse(&item.url)?;

    advance(state, PageState::Fetching);
    let raw = fetcher.fetch(&url).await?;
    advance(state, PageState::Fetched);

    let page = transformer
        .transform(&raw, &url)
        .ok_or(PageError::NoContent)?;
    advance(state, PageState::Transformed);

    let content_hash = content_hash(&page.text);
    advance(state, PageState::HashChecked);

    Ok(FetchedPage {
        url,
        page,
        content_hash,
    })
}

fn advance(state: &mut PageState, next: PageState) {
    debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
    *state = next;
}

/// Creates the output directory and checks that files can be created in it
///
/// Returns the canonical form of `path`, so artifact paths and session
/// files compare equal however the directory was spelled.
fn ensure_output_directory(path: &Path) -> ConfigResult<PathBuf> {
    let not_writable = |source| ConfigError::OutputNotWritable {
        path: path.display().to_string(),
        source,
    };

    std::fs::create_dir_all(path).map_err(not_writable)?;
    let canonical = std::fs::canonicalize(path).map_err(not_writable)?;
    tempfile::NamedTempFile::new_in(&canonical).map_err(not_writable)?;
    Ok(canonical)
}

fn stop_requested(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Resolves once the stop signal holds `true`; never resolves without one
async fn wait_for_stop(shutdown: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };

    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped: no stop can arrive any more
            return std::future::pending().await;
        }
    }
}

/// Sleeps for `duration` unless the stop signal fires first
///
/// Returns `false` when interrupted.
async fn pause(duration: Duration, shutdown: &mut Option<watch::Receiver<bool>>) -> bool {
    if duration.is_zero() {
        return true;
    }

    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = wait_for_stop(shutdown) => false,
    }
}

/// Runs a complete crawl with the HTTP fetcher and the HTML transformer
///
/// # Example
///
/// ```no_run
/// use docmirror::config::load_config;
/// use docmirror::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("docmirror.toml"))?;
/// let stats = crawl(config).await?;
/// println!("{} pages changed", stats.changed_pages());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config) -> Result<CrawlStatistics> {
    let mut coordinator = default_coordinator(config)?;
    coordinator.run().await
}

/// Like [`crawl`], stopping gracefully once `shutdown` holds `true`
pub async fn crawl_until(
    config: Config,
    shutdown: watch::Receiver<bool>,
) -> Result<CrawlStatistics> {
    let mut coordinator = default_coordinator(config)?.with_shutdown(shutdown);
    coordinator.run().await
}

fn default_coordinator(config: Config) -> Result<Coordinator> {
    let fetcher = HttpFetcher::from_config(&config)?;
    Coordinator::new(config, Arc::new(fetcher), Arc::new(HtmlTransformer))
}
