//! Breadth-first frontier
//!
//! This module handles:
//! - FIFO ordering of (URL, depth) work items
//! - The visited set, marked at dequeue time
//! - Scope policy: URL prefix allow-list, maximum depth, maximum page count

use crate::url::matches_any_prefix;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueuedUrl {
    /// The normalized URL
    pub url: String,

    /// BFS depth assigned at first discovery
    pub depth: u32,
}

impl QueuedUrl {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Why `enqueue` refused a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    AlreadyVisited,
    AlreadyQueued,
    OutOfScope,
    TooDeep,
    PageLimitReached,
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Frontier of a single crawl run
///
/// A URL is marked visited exactly once, when it is dequeued. Until then it
/// can be discovered again from other parents; those later discoveries are
/// ignored, so the depth it was first queued with sticks.
#[derive(Debug)]
pub struct Frontier {
    /// URLs already handed out for processing
    visited: HashSet<String>,

    /// URLs currently in `queue`
    pending: HashSet<String>,

    /// Pending work, head first
    queue: VecDeque<QueuedUrl>,

    /// URL prefixes a candidate must start with
    allowed_prefixes: Vec<String>,

    max_depth: u32,

    max_pages: usize,

    /// Number of URLs ever accepted in this run
    enqueued_total: usize,

    limit_logged: bool,
}

impl Frontier {
    /// Creates an empty frontier with the given scope policy
    pub fn new(allowed_prefixes: Vec<String>, max_depth: u32, max_pages: usize) -> Self {
        Self {
            visited: HashSet::new(),
            pending: HashSet::new(),
            queue: VecDeque::new(),
            allowed_prefixes,
            max_depth,
            max_pages,
            enqueued_total: 0,
            limit_logged: false,
        }
    }

    /// Adds a URL to the tail of the queue if the scope policy allows it
    ///
    /// The URL is not marked visited here.
    pub fn enqueue(&mut self, url: &str, depth: u32) -> EnqueueOutcome {
        if self.visited.contains(url) {
            return EnqueueOutcome::AlreadyVisited;
        }

        if self.pending.contains(url) {
            return EnqueueOutcome::AlreadyQueued;
        }

        if !matches_any_prefix(&self.allowed_prefixes, url) {
            return EnqueueOutcome::OutOfScope;
        }

        if depth > self.max_depth {
            return EnqueueOutcome::TooDeep;
        }

        if self.enqueued_total >= self.max_pages {
            if !self.limit_logged {
                tracing::info!(
                    "Page limit of {} reached, no further URLs will be queued",
                    self.max_pages
                );
                self.limit_logged = true;
            }
            return EnqueueOutcome::PageLimitReached;
        }

        self.pending.insert(url.to_string());
        self.queue.push_back(QueuedUrl::new(url, depth));
        self.enqueued_total += 1;

        EnqueueOutcome::Accepted
    }

    /// Pops the head of the queue and marks it visited
    pub fn dequeue(&mut self) -> Option<QueuedUrl> {
        let next = self.queue.pop_front()?;
        self.pending.remove(&next.url);
        self.visited.insert(next.url.clone());
        Some(next)
    }

    /// Puts a dequeued but unfinished URL back at the head of the queue
    ///
    /// Used when a run stops with work in flight so the checkpoint still
    /// lists it as pending.
    pub fn requeue_front(&mut self, item: QueuedUrl) {
        self.visited.remove(&item.url);
        if self.pending.insert(item.url.clone()) {
            self.queue.push_front(item);
        }
    }

    /// Replaces the frontier content with a saved session
    ///
    /// Queue entries that are also in `visited` are dropped.
    pub fn restore(&mut self, visited: HashSet<String>, queue: Vec<QueuedUrl>) {
        self.queue.clear();
        self.pending.clear();
        self.visited = visited;

        for item in queue {
            if self.visited.contains(&item.url) || !self.pending.insert(item.url.clone()) {
                continue;
            }
            self.queue.push_back(item);
        }

        self.enqueued_total = self.visited.len() + self.queue.len();
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Copy of the pending queue, head first
    pub fn queue_snapshot(&self) -> Vec<QueuedUrl> {
        self.queue.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs ever accepted in this run
    pub fn enqueued_total(&self) -> usize {
        self.enqueued_total
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }
}
