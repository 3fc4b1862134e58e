use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Upper bound a scripted turn waits on a gate, so a broken test fails
/// instead of hanging the suite.
pub const GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// One-shot latch. Once opened it stays open.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (open, cv) = &*self.inner;
        *open.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cv.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the gate opens. Returns false on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (open, cv) = &*self.inner;
        let guard = open.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cv
            .wait_timeout_while(guard, timeout, |open| !*open)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
