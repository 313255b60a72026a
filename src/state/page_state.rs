//! Page state definitions for tracking crawl progress
//!
//! A page moves through
//! `Enqueued → Fetching → {Fetched → Transformed → HashChecked → {Skipped | Saved}} | Failed`.

use std::fmt;

/// Represents the current state of a page within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Page is waiting in the frontier
    Enqueued,

    /// Page is being fetched by a worker
    Fetching,

    /// Raw bytes were received
    Fetched,

    /// Normalized text and links were extracted
    Transformed,

    /// Content hash was computed and compared
    HashChecked,

    // ===== Terminal States =====
    /// Content unchanged and artifact present, nothing written
    Skipped,

    /// Artifact written and metadata updated
    Saved,

    /// Fetch, transform or artifact write failed
    Failed,
}

/// Final result of processing one page, used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Saved for the first time
    New,
    /// Saved over an older version
    Updated,
    /// Unchanged
    Skipped,
    /// Failed somewhere along the way
    Error,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Saved | Self::Failed)
    }

    /// Checks whether moving from `self` to `next` is allowed
    ///
    /// Every active state may fail. `Enqueued` fails when its URL cannot be
    /// fetched at all, e.g. an unparsable entry restored from a session.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;

        match (self, next) {
            (Enqueued, Fetching) => true,
            (Fetching, Fetched) => true,
            (Fetched, Transformed) => true,
            (Transformed, HashChecked) => true,
            (HashChecked, Skipped) | (HashChecked, Saved) => true,
            (Enqueued | Fetching | Fetched | Transformed | HashChecked, Failed) => true,
            _ => false,
        }
    }

    /// Returns the state after `next`, or an error for an illegal transition
    pub fn transition(self, next: PageState) -> crate::Result<PageState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::MirrorError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Transformed => "transformed",
            Self::HashChecked => "hash_checked",
            Self::Skipped => "skipped",
            Self::Saved => "saved",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Enqueued,
            Self::Fetching,
            Self::Fetched,
            Self::Transformed,
            Self::HashChecked,
            Self::Skipped,
            Self::Saved,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!PageState::Enqueued.is_terminal());
        assert!(!PageState::Fetching.is_terminal());
        assert!(!PageState::Fetched.is_terminal());
        assert!(!PageState::Transformed.is_terminal());
        assert!(!PageState::HashChecked.is_terminal());

        assert!(PageState::Skipped.is_terminal());
        assert!(PageState::Saved.is_terminal());
        assert!(PageState::Failed.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let state = PageState::Enqueued
            .transition(PageState::Fetching)
            .and_then(|s| s.transition(PageState::Fetched))
            .and_then(|s| s.transition(PageState::Transformed))
            .and_then(|s| s.transition(PageState::HashChecked))
            .and_then(|s| s.transition(PageState::Saved))
            .unwrap();
        assert_eq!(state, PageState::Saved);

        assert!(PageState::HashChecked.can_transition_to(PageState::Skipped));
    }

    #[test]
    fn test_failure_transitions() {
        assert!(PageState::Fetching.can_transition_to(PageState::Failed));
        assert!(PageState::Fetched.can_transition_to(PageState::Failed));
        assert!(PageState::Transformed.can_transition_to(PageState::Failed));
        assert!(PageState::HashChecked.can_transition_to(PageState::Failed));
        assert_eq!(
            PageState::Enqueued.transition(PageState::Failed).unwrap(),
            PageState::Failed
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [PageState::Skipped, PageState::Saved, PageState::Failed] {
            for next in PageState::all_states() {
                assert!(
                    !terminal.can_transition_to(next),
                    "{:?} -> {:?} should be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_skipping_steps_is_rejected() {
        let result = PageState::Fetching.transition(PageState::Saved);
        assert!(matches!(
            result,
            Err(crate::MirrorError::InvalidTransition {
                from: PageState::Fetching,
                to: PageState::Saved
            })
        ));
        assert!(!PageState::Enqueued.can_transition_to(PageState::HashChecked));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PageState::Enqueued), "enqueued");
        assert_eq!(format!("{}", PageState::HashChecked), "hash_checked");
    }

    #[test]
    fn test_all_states_complete() {
        let all = PageState::all_states();
        assert_eq!(all.len(), 8);

        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "Duplicate state found");
            }
        }
    }
}
