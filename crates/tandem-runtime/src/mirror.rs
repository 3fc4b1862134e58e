//! The conversation worker's read-mostly copy of shared memory.
//!
//! The memory worker replaces the whole state after each consolidation and
//! bumps a publish generation. The conversation worker compares generations
//! before each turn and re-syncs its executor when the mirror is newer.
//! Publishing never touches the conversation executor's lock.

use std::sync::{PoisonError, RwLock};

use tandem_core::SharedMemoryState;

#[derive(Debug)]
struct Published {
    state: SharedMemoryState,
    generation: u64,
}

#[derive(Debug)]
pub struct SharedStateMirror {
    inner: RwLock<Published>,
}

impl SharedStateMirror {
    /// Start at generation 0 with the conversation executor's own state
    pub fn new(initial: SharedMemoryState) -> Self {
        Self {
            inner: RwLock::new(Published {
                state: initial,
                generation: 0,
            }),
        }
    }

    /// Replace the mirrored state wholesale. Returns the new generation.
    pub fn publish(&self, state: SharedMemoryState) -> u64 {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.state = state;
        inner.generation += 1;
        inner.generation
    }

    pub fn snapshot(&self) -> SharedMemoryState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// The state and its generation if anything was published after `seen`.
    pub fn snapshot_if_newer(&self, seen: u64) -> Option<(u64, SharedMemoryState)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        (inner.generation > seen).then(|| (inner.generation, inner.state.clone()))
    }
}
