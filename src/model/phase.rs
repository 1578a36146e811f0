//! Category task phases
//!
//! Each category pipeline walks `Pending → Discovering → Scraping(i/N) →
//! Aggregating → Done`. Discovery failure jumps straight to `Done(failed)`.

use crate::LedgerError;
use std::fmt;

/// Represents the current phase of one category task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryPhase {
    // ===== Active Phases =====
    /// Task created, not yet started
    Pending,

    /// Fetching the locations index
    Discovering,

    /// Scraping locations; `completed` of `total` have settled
    Scraping { completed: usize, total: usize },

    /// Merging per-location results into the category result
    Aggregating,

    // ===== Terminal Phase =====
    /// Task settled with its final success flag
    Done { success: bool },
}

impl CategoryPhase {
    /// Returns true once the task has settled
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Discovering) => true,
            (Self::Discovering, Self::Scraping { completed: 0, .. }) => true,
            (Self::Discovering, Self::Done { success: false }) => true,
            (
                Self::Scraping { completed, total },
                Self::Scraping {
                    completed: next_completed,
                    total: next_total,
                },
            ) => total == next_total && *next_completed == completed + 1 && next_completed <= total,
            (Self::Scraping { completed, total }, Self::Aggregating) => completed == total,
            (Self::Aggregating, Self::Done { .. }) => true,
            _ => false,
        }
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Discovering => "discovering",
            Self::Scraping { .. } => "scraping",
            Self::Aggregating => "aggregating",
            Self::Done { success: true } => "done",
            Self::Done { success: false } => "failed",
        }
    }
}

impl fmt::Display for CategoryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scraping { completed, total } => write!(f, "scraping({}/{})", completed, total),
            other => f.write_str(other.label()),
        }
    }
}

/// Tracks one category task's phase and rejects illegal jumps
#[derive(Debug)]
pub struct PhaseTracker {
    category: String,
    phase: CategoryPhase,
}

impl PhaseTracker {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            phase: CategoryPhase::Pending,
        }
    }

    pub fn phase(&self) -> CategoryPhase {
        self.phase
    }

    /// Moves to `next`, logging the step
    pub fn advance(&mut self, next: CategoryPhase) -> Result<(), LedgerError> {
        if !self.phase.can_transition_to(&next) {
            return Err(LedgerError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }

        tracing::debug!(category = %self.category, from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        Ok(())
    }

    /// Records one more settled location while scraping
    pub fn location_settled(&mut self) -> Result<(), LedgerError> {
        match self.phase {
            CategoryPhase::Scraping { completed, total } => self.advance(CategoryPhase::Scraping {
                completed: completed + 1,
                total,
            }),
            other => Err(LedgerError::InvalidTransition {
                from: other,
                to: other,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!CategoryPhase::Pending.is_terminal());
        assert!(!CategoryPhase::Discovering.is_terminal());
        assert!(!CategoryPhase::Scraping {
            completed: 1,
            total: 2
        }
        .is_terminal());
        assert!(!CategoryPhase::Aggregating.is_terminal());

        assert!(CategoryPhase::Done { success: true }.is_terminal());
        assert!(CategoryPhase::Done { success: false }.is_terminal());
    }

    #[test]
    fn test_happy_path() {
        let mut tracker = PhaseTracker::new("Whole Flower");
        tracker.advance(CategoryPhase::Discovering).unwrap();
        tracker
            .advance(CategoryPhase::Scraping {
                completed: 0,
                total: 2,
            })
            .unwrap();
        tracker.location_settled().unwrap();
        tracker.location_settled().unwrap();
        tracker.advance(CategoryPhase::Aggregating).unwrap();
        tracker
            .advance(CategoryPhase::Done { success: true })
            .unwrap();
        assert!(tracker.phase().is_terminal());
    }

    #[test]
    fn test_discovery_failure_goes_straight_to_done() {
        let mut tracker = PhaseTracker::new("Pre-Rolls");
        tracker.advance(CategoryPhase::Discovering).unwrap();
        tracker
            .advance(CategoryPhase::Done { success: false })
            .unwrap();
        assert_eq!(tracker.phase().label(), "failed");
    }

    #[test]
    fn test_rejects_illegal_transitions() {
        let mut tracker = PhaseTracker::new("Ground & Shake");
        assert!(matches!(
            tracker.advance(CategoryPhase::Aggregating),
            Err(LedgerError::InvalidTransition { .. })
        ));

        tracker.advance(CategoryPhase::Discovering).unwrap();
        tracker
            .advance(CategoryPhase::Scraping {
                completed: 0,
                total: 2,
            })
            .unwrap();
        tracker.location_settled().unwrap();
        // Cannot aggregate with a location still in flight
        assert!(tracker.advance(CategoryPhase::Aggregating).is_err());
        tracker.location_settled().unwrap();
        // Cannot settle more locations than were scheduled
        assert!(tracker.location_settled().is_err());
    }

    #[test]
    fn test_discovering_cannot_report_success() {
        assert!(!CategoryPhase::Discovering.can_transition_to(&CategoryPhase::Done { success: true }));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CategoryPhase::Pending), "pending");
        assert_eq!(
            format!(
                "{}",
                CategoryPhase::Scraping {
                    completed: 3,
                    total: 7
                }
            ),
            "scraping(3/7)"
        );
        assert_eq!(format!("{}", CategoryPhase::Done { success: true }), "done");
    }
}
