use serde::{Deserialize, Serialize};

use crate::domain::PhotoId;

/// Phase of one display cycle. A new cycle starts on every refresh,
/// back-navigation, and post-delete re-display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPhase {
    #[default]
    Idle,
    Fetching,
    Displayed,
    FailedFallback,
}

impl DisplayPhase {
    pub fn is_fetching(self) -> bool {
        matches!(self, Self::Fetching)
    }

    pub fn is_displayed(self) -> bool {
        matches!(self, Self::Displayed)
    }

    /// Navigation and deletion are only meaningful once something is shown.
    pub fn allows_review_actions(self) -> bool {
        matches!(self, Self::Displayed)
    }
}

/// Point-in-time copy of the controller state for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSnapshot {
    pub history_len: usize,
    /// Index of the displayed entry within the history; `None` when nothing
    /// from the history is shown (empty history or sample mode).
    pub cursor: Option<usize>,
    pub current: Option<PhotoId>,
    pub phase: DisplayPhase,
    pub fetch_progress: f64,
    pub sample_mode: bool,
}

impl ReviewSnapshot {
    pub fn idle() -> Self {
        Self {
            history_len: 0,
            cursor: None,
            current: None,
            phase: DisplayPhase::Idle,
            fetch_progress: 0.0,
            sample_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_predicates() {
        assert!(DisplayPhase::Fetching.is_fetching());
        assert!(DisplayPhase::Displayed.allows_review_actions());
        assert!(!DisplayPhase::FailedFallback.allows_review_actions());
        assert_eq!(DisplayPhase::default(), DisplayPhase::Idle);
    }

    #[test]
    fn idle_snapshot_shows_nothing() {
        let snapshot = ReviewSnapshot::idle();
        assert_eq!(snapshot.cursor, None);
        assert_eq!(snapshot.current, None);
        assert!(!snapshot.sample_mode);
    }
}
