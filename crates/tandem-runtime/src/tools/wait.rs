use std::sync::Arc;
use std::time::Duration;

use tandem_core::{ExecutionResult, Tool};

use super::WAIT_FOR_MEMORY_TOOL;
use crate::rendezvous::{ParkOutcome, Rendezvous};

/// Parks the calling conversation turn until the memory worker signals.
///
/// Closes over the orchestrator's [`Rendezvous`]; the executor that calls it
/// sees an ordinary tool. After a successful wait the orchestrator repeats the
/// conversation turn once.
pub struct WaitForMemoryTool {
    rendezvous: Arc<Rendezvous>,
    timeout: Option<Duration>,
}

impl WaitForMemoryTool {
    pub fn new(rendezvous: Arc<Rendezvous>, timeout: Option<Duration>) -> Self {
        Self {
            rendezvous,
            timeout,
        }
    }
}

impl Tool for WaitForMemoryTool {
    fn name(&self) -> &str {
        WAIT_FOR_MEMORY_TOOL
    }

    fn call(&self, _input: String) -> ExecutionResult {
        tracing::debug!(timeout = ?self.timeout, "Conversation turn parked on memory consolidation");
        match self.rendezvous.park(self.timeout) {
            ParkOutcome::Signalled => {
                tracing::debug!("Memory consolidation finished, turn will be repeated");
                ExecutionResult::success("Memory updated. The turn will be repeated with refreshed memory.")
            }
            ParkOutcome::TimedOut => {
                tracing::warn!(
                    timeout = ?self.timeout,
                    "Timed out waiting for memory consolidation, continuing without fresh memory"
                );
                ExecutionResult::failure(
                    "Memory consolidation did not finish in time. Continue with current memory.",
                )
            }
        }
    }
}
