//! State tracking for pages moving through a crawl
//!
//! This module contains the per-page state machine used by the coordinator.

mod page_state;

pub use page_state::{PageOutcome, PageState};
