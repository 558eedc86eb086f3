//! Shared scheduler state
//!
//! Everything the loader, dispatcher and drain poll mutate lives here, behind
//! a single mutex owned by the lifecycle controller.

use tracing::debug;

use super::throttle::Throttle;
use super::timeline::Timeline;
use crate::domain::ModelBudget;

/// Lifecycle phase of a Prompter run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Draining,
    Completed { success: bool },
}

impl Phase {
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Running | Phase::Draining)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed { .. })
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Running => write!(f, "running"),
            Phase::Draining => write!(f, "draining"),
            Phase::Completed { success: true } => write!(f, "completed"),
            Phase::Completed { success: false } => write!(f, "aborted"),
        }
    }
}

/// Pagination and progress counters for one run
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Id of the last item placed from the store
    pub cursor: u64,

    /// Sends started but not yet finished
    pub in_flight: usize,

    pub phase: Phase,
}

/// Run statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrompterStats {
    pub loaded: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub retried: u64,
    pub dropped: u64,
    pub exhausted: u64,
    pub suppressed: u64,
    pub saved: u64,
    pub save_failures: u64,
    pub peak_occupied: usize,
}

/// State protected by the scheduler mutex
#[derive(Debug)]
pub struct SchedulerState {
    pub timeline: Timeline,
    pub throttle: Throttle,
    pub run: RunState,
    pub stats: PrompterStats,
}

impl SchedulerState {
    pub fn new(budget: &ModelBudget) -> Self {
        debug!(rpm = budget.rpm, "SchedulerState::new: called");
        Self {
            timeline: Timeline::new(budget.capacity()),
            throttle: Throttle::new(),
            run: RunState::default(),
            stats: PrompterStats::default(),
        }
    }

    /// Refresh the occupancy high-water mark
    pub fn note_occupancy(&mut self) {
        self.stats.peak_occupied = self.stats.peak_occupied.max(self.timeline.occupied());
    }

    /// Nothing queued and nothing outstanding
    pub fn is_quiescent(&self) -> bool {
        self.run.in_flight == 0 && self.timeline.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkItem;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Idle.to_string(), "idle");
        assert_eq!(Phase::Draining.to_string(), "draining");
        assert_eq!(Phase::Completed { success: true }.to_string(), "completed");
        assert_eq!(Phase::Completed { success: false }.to_string(), "aborted");
    }

    #[test]
    fn test_phase_predicates() {
        assert!(!Phase::Idle.is_active());
        assert!(Phase::Running.is_active());
        assert!(Phase::Draining.is_active());
        assert!(Phase::Completed { success: false }.is_terminal());
        assert!(!Phase::Running.is_terminal());
    }

    #[test]
    fn test_quiescence() {
        let mut state = SchedulerState::new(&ModelBudget::new("m", 4, 16));
        assert_eq!(state.timeline.capacity(), 8);
        assert!(state.is_quiescent());

        state.run.in_flight = 1;
        assert!(!state.is_quiescent());

        state.run.in_flight = 0;
        state.timeline.occupy(3, WorkItem::new(1, "", "x")).unwrap();
        state.note_occupancy();
        assert!(!state.is_quiescent());
        assert_eq!(state.stats.peak_occupied, 1);
    }
}
