//! Step state machine.
//!
//! ```text
//! Idle → MemoryLaunched → ConversationRunning → (ConversationRetrying)? → Merging → Done
//! ```
//!
//! `Done` is re-entered as `Idle` by the next call; each step gets a fresh
//! [`StepTracker`].

use std::fmt;

use tandem_core::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepPhase {
    Idle,
    MemoryLaunched,
    ConversationRunning,
    ConversationRetrying,
    Merging,
    Done,
}

impl StepPhase {
    pub fn can_advance_to(self, next: StepPhase) -> bool {
        use StepPhase::*;
        matches!(
            (self, next),
            (Idle, MemoryLaunched)
                | (MemoryLaunched, ConversationRunning)
                | (ConversationRunning, ConversationRetrying)
                | (ConversationRunning, Merging)
                | (ConversationRetrying, Merging)
                | (Merging, Done)
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            StepPhase::Idle => "idle",
            StepPhase::MemoryLaunched => "memory_launched",
            StepPhase::ConversationRunning => "conversation_running",
            StepPhase::ConversationRetrying => "conversation_retrying",
            StepPhase::Merging => "merging",
            StepPhase::Done => "done",
        }
    }
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Records the phases one step passes through.
#[derive(Debug)]
pub struct StepTracker {
    step_id: StepId,
    history: Vec<StepPhase>,
}

impl StepTracker {
    pub fn new(step_id: StepId) -> Self {
        Self {
            step_id,
            history: vec![StepPhase::Idle],
        }
    }

    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    pub fn phase(&self) -> StepPhase {
        // history always starts with Idle
        self.history.last().copied().unwrap_or(StepPhase::Idle)
    }

    pub fn history(&self) -> &[StepPhase] {
        &self.history
    }

    pub fn retried(&self) -> bool {
        self.history.contains(&StepPhase::ConversationRetrying)
    }

    pub fn advance(&mut self, next: StepPhase) {
        let current = self.phase();
        debug_assert!(
            current.can_advance_to(next),
            "illegal step transition {} -> {}",
            current,
            next
        );
        tracing::debug!(step_id = %self.step_id, from = %current, to = %next, "Step phase transition");
        self.history.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_straight_through_step() {
        let mut tracker = StepTracker::new(StepId::new());
        for phase in [
            StepPhase::MemoryLaunched,
            StepPhase::ConversationRunning,
            StepPhase::Merging,
            StepPhase::Done,
        ] {
            tracker.advance(phase);
        }
        assert_eq!(tracker.phase(), StepPhase::Done);
        assert!(!tracker.retried());
        assert_eq!(tracker.history().len(), 5);
    }

    #[test]
    fn test_retry_path() {
        let mut tracker = StepTracker::new(StepId::new());
        tracker.advance(StepPhase::MemoryLaunched);
        tracker.advance(StepPhase::ConversationRunning);
        tracker.advance(StepPhase::ConversationRetrying);
        tracker.advance(StepPhase::Merging);
        assert!(tracker.retried());
    }

    #[rstest]
    #[case(StepPhase::Idle, StepPhase::ConversationRunning)]
    #[case(StepPhase::ConversationRetrying, StepPhase::ConversationRetrying)]
    #[case(StepPhase::Done, StepPhase::MemoryLaunched)]
    #[case(StepPhase::Merging, StepPhase::ConversationRunning)]
    fn test_illegal_transitions(#[case] from: StepPhase, #[case] to: StepPhase) {
        assert!(!from.can_advance_to(to));
    }

    #[test]
    #[should_panic(expected = "illegal step transition")]
    #[cfg(debug_assertions)]
    fn test_advance_panics_on_illegal_transition_in_debug() {
        let mut tracker = StepTracker::new(StepId::new());
        tracker.advance(StepPhase::Merging);
    }
}
