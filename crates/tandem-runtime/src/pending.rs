//! Single-slot holder for memory output nobody has claimed yet.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tandem_core::StepResult;

/// At most one unclaimed memory result. A second deposit before the slot is
/// drained merges into the first (earlier output first) instead of replacing it.
#[derive(Debug, Default)]
pub struct PendingMemoryResult {
    slot: Mutex<Option<StepResult>>,
}

impl PendingMemoryResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<StepResult>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn deposit(&self, result: StepResult) {
        let mut slot = self.lock();
        let combined = match slot.take() {
            Some(existing) => existing.merge(result),
            None => result,
        };
        *slot = Some(combined);
    }

    /// Drain the slot
    pub fn take(&self) -> Option<StepResult> {
        self.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }
}
