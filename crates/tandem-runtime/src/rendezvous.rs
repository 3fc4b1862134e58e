//! # Rendezvous
//!
//! The monitor that lets the conversation executor's own tool call block
//! until the memory worker finishes, without blocking anything else.
//!
//! ## Protocol
//!
//! Every memory worker launch opens a new epoch and every finished worker
//! closes the oldest open one. Launches are serialized and a launch waits
//! for the previous worker, so the n-th signal always belongs to epoch n.
//!
//! - [`Rendezvous::launch`] opens the next epoch. It must happen-before the
//!   spawn.
//! - [`Rendezvous::signal`] is called by the memory thread, exactly once per
//!   epoch, after its result and state are published.
//! - [`Rendezvous::bind_turn`] ties the conversation turn that is about to run
//!   to its step's epoch. It is called under the conversation lock.
//! - [`Rendezvous::park`] is called only from the conversation turn's call
//!   stack and waits until the bound epoch has been signalled. A signal that
//!   lands before the park is not lost, and a later step's launch cannot
//!   make a parker wait on the wrong worker.
//!
//! `Park` and `Signal` for the same step never run on the same thread: only
//! the memory thread signals, and only the caller thread parks.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How a [`Rendezvous::park`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkOutcome {
    /// The memory worker finished; the turn should be repeated
    Signalled,
    /// Gave up waiting; the turn proceeds without fresh memory
    TimedOut,
}

#[derive(Debug, Default)]
struct RendezvousState {
    /// Epochs opened by `launch`
    launched: u64,
    /// Epochs closed by `signal`
    signalled: u64,
    /// Epoch of the conversation turn currently allowed to park
    bound: Option<u64>,
    /// A park completed since the last `take_waited`
    waited: bool,
    /// A park timed out since the last `take_degraded`
    degraded: bool,
}

impl RendezvousState {
    fn park_target(&self) -> u64 {
        self.bound.unwrap_or(self.launched)
    }
}

#[derive(Debug, Default)]
pub struct Rendezvous {
    state: Mutex<RendezvousState>,
    signalled_cv: Condvar,
}

impl Rendezvous {
    pub fn new() -> Self {
        Self::default()
    }

    // The state is plain counters and flags; a panic while holding the lock
    // cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, RendezvousState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the epoch for the memory worker about to be launched.
    pub fn launch(&self) -> u64 {
        let mut state = self.lock();
        state.launched += 1;
        state.launched
    }

    /// Close the oldest open epoch and wake any parker.
    pub fn signal(&self) {
        self.lock().signalled += 1;
        self.signalled_cv.notify_all();
    }

    /// Bind the next parks to `epoch` and clear the flags of any earlier turn.
    pub fn bind_turn(&self, epoch: u64) {
        let mut state = self.lock();
        state.bound = Some(epoch);
        state.waited = false;
        state.degraded = false;
    }

    /// Whether the most recently launched memory worker has signalled.
    pub fn is_finished(&self) -> bool {
        let state = self.lock();
        state.signalled >= state.launched
    }

    /// Block until the bound epoch's memory worker signals, or until
    /// `timeout` elapses.
    ///
    /// On `Signalled` the retry flag is raised for the orchestrator; on
    /// `TimedOut` the degraded flag is raised instead.
    pub fn park(&self, timeout: Option<Duration>) -> ParkOutcome {
        let target = self.lock().park_target();
        let (mut state, signalled) = self.wait_for(target, timeout);
        if signalled {
            state.waited = true;
            ParkOutcome::Signalled
        } else {
            state.degraded = true;
            ParkOutcome::TimedOut
        }
    }

    /// Wait for the most recently launched memory worker without requesting
    /// a retry. Returns whether it finished in time.
    pub fn wait_finished(&self, timeout: Option<Duration>) -> bool {
        let target = self.lock().launched;
        self.wait_for(target, timeout).1
    }

    /// Read and clear the retry flag.
    pub fn take_waited(&self) -> bool {
        std::mem::take(&mut self.lock().waited)
    }

    /// Read and clear the degraded-consolidation flag.
    pub fn take_degraded(&self) -> bool {
        std::mem::take(&mut self.lock().degraded)
    }

    fn wait_for(
        &self,
        epoch: u64,
        timeout: Option<Duration>,
    ) -> (MutexGuard<'_, RendezvousState>, bool) {
        let state = self.lock();
        let pending = |s: &mut RendezvousState| s.signalled < epoch;

        let state = match timeout {
            None => self
                .signalled_cv
                .wait_while(state, pending)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.signalled_cv
                    .wait_timeout_while(state, timeout, pending)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };

        let signalled = state.signalled >= epoch;
        (state, signalled)
    }
}

/// Signals the rendezvous when dropped, so a panicking memory worker still
/// releases a parked conversation turn.
pub(crate) struct SignalOnDrop<'a> {
    rendezvous: &'a Rendezvous,
}

impl<'a> SignalOnDrop<'a> {
    pub(crate) fn new(rendezvous: &'a Rendezvous) -> Self {
        Self { rendezvous }
    }
}

impl Drop for SignalOnDrop<'_> {
    fn drop(&mut self) {
        self.rendezvous.signal();
    }
}
