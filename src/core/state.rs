// core/state.rs

// Phase of the greedy view planner as a small finite state machine. The
// planner reports each transition here so that an illegal ordering (for
// example committing without a sweep) shows up in the logs.

// Dependencies
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Planner phases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerPhase {
    /// No seed point yet, or cancelled
    Idle,
    /// Accumulating the MI surface
    Sweeping,
    /// Picking the best free cell
    Selecting,
    /// Applying lookahead conditioning on the pick
    Conditioning,
    /// Moving to the closest candidate
    Committing,
}

impl PlannerPhase {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition(self, next: PlannerPhase) -> bool {
        use PlannerPhase::*;
        match (self, next) {
            (_, Idle) => true,
            (Idle, Sweeping) => true,
            (Sweeping, Selecting) => true,
            // A round can be abandoned before conditioning
            (Sweeping, Sweeping) | (Selecting, Sweeping) => true,
            (Selecting, Conditioning) => true,
            (Conditioning, Sweeping) => true,
            (Sweeping, Committing) | (Selecting, Committing) | (Conditioning, Committing) => true,
            (Committing, Sweeping) => true,
            _ => false,
        }
    }
}

/// Tracks the current phase and counts illegal transitions.
#[derive(Clone, Debug)]
pub struct PhaseTracker {
    current: PlannerPhase,
    violations: u32,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    /// Starts in `Idle`.
    pub fn new() -> Self {
        PhaseTracker {
            current: PlannerPhase::Idle,
            violations: 0,
        }
    }

    /// Moves to `next`, logging an illegal transition rather than refusing it.
    pub fn advance(&mut self, next: PlannerPhase) {
        if self.current.can_transition(next) {
            debug!("Planner phase {:?} -> {:?}", self.current, next);
        } else {
            self.violations += 1;
            warn!("Unexpected planner phase transition {:?} -> {:?}", self.current, next);
        }
        self.current = next;
    }

    /// Current phase.
    pub fn current(&self) -> PlannerPhase {
        self.current
    }

    /// Number of illegal transitions seen.
    pub fn violations(&self) -> u32 {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_iteration_is_legal() {
        let mut tracker = PhaseTracker::new();
        for phase in [
            PlannerPhase::Sweeping,
            PlannerPhase::Selecting,
            PlannerPhase::Conditioning,
            PlannerPhase::Sweeping,
            PlannerPhase::Selecting,
            PlannerPhase::Conditioning,
            PlannerPhase::Committing,
            PlannerPhase::Sweeping,
        ] {
            tracker.advance(phase);
        }
        assert_eq!(tracker.violations(), 0);
        assert_eq!(tracker.current(), PlannerPhase::Sweeping);
    }

    #[test]
    fn commit_from_idle_is_flagged() {
        let mut tracker = PhaseTracker::new();
        tracker.advance(PlannerPhase::Committing);
        assert_eq!(tracker.violations(), 1);
    }
}
