//! Wrappers that run one executor turn and convert every failure into a
//! [`StepResult`] field at the point where it happened.

mod conversation;
mod memory;

pub use conversation::{ConversationTurn, ConversationWorker};
pub use memory::MemoryWorker;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tandem_core::{AgentRole, Executor, StatePersister, StepResult, TurnInput};

/// Run one turn, catching both `Err` and panics.
pub(crate) fn run_guarded(
    executor: &mut dyn Executor,
    input: &TurnInput,
    role: AgentRole,
) -> StepResult {
    let agent = executor.id().clone();
    match panic::catch_unwind(AssertUnwindSafe(|| executor.run_step(input))) {
        Ok(Ok(result)) => result,
        Ok(Err(error)) => {
            tracing::warn!(agent = %agent, worker = %role, error = %error, "Executor turn failed");
            StepResult::failed()
        }
        Err(payload) => {
            tracing::error!(
                agent = %agent,
                worker = %role,
                panic = panic_message(payload.as_ref()),
                "Executor panicked during turn"
            );
            StepResult::failed()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Save an executor's state; failures are logged, never propagated.
pub(crate) fn persist_state(persister: Option<&Arc<dyn StatePersister>>, executor: &dyn Executor) {
    let Some(persister) = persister else {
        return;
    };
    let mut state = executor.agent_state();
    state.touch();
    if let Err(error) = persister.persist(&state) {
        tracing::warn!(agent = %state.id, role = %state.role, error = %error, "Failed to persist agent state");
    }
}
