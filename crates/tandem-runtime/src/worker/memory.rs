use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tandem_core::{AgentId, AgentRole, AgentState, Executor, StatePersister, TurnInput};

use super::{persist_state, run_guarded};
use crate::mirror::SharedStateMirror;
use crate::pending::PendingMemoryResult;
use crate::rendezvous::{Rendezvous, SignalOnDrop};

/// Owns the consolidation executor, the only durable writer of shared memory.
pub struct MemoryWorker {
    executor: Mutex<Box<dyn Executor>>,
    agent_id: AgentId,
    persister: Option<Arc<dyn StatePersister>>,
}

impl MemoryWorker {
    pub fn new(executor: Box<dyn Executor>, persister: Option<Arc<dyn StatePersister>>) -> Self {
        let agent_id = executor.id().clone();
        Self {
            executor: Mutex::new(executor),
            agent_id,
            persister,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Executor>> {
        self.executor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks while a consolidation turn is running.
    pub fn agent_state(&self) -> AgentState {
        self.lock().agent_state()
    }

    /// One consolidation turn. Runs on the memory thread.
    ///
    /// Order: run, persist, deposit result, publish state, signal. The signal
    /// comes last (and also fires if anything above panics), so a conversation
    /// turn woken by it observes the deposited result and the published state.
    pub fn consolidate(
        &self,
        input: &TurnInput,
        pending: &PendingMemoryResult,
        mirror: &SharedStateMirror,
        rendezvous: &Rendezvous,
    ) {
        let _signal = SignalOnDrop::new(rendezvous);
        let mut executor = self.lock();

        let result = run_guarded(&mut **executor, input, AgentRole::Memory);
        persist_state(self.persister.as_ref(), &**executor);

        let failed = result.function_failed;
        pending.deposit(result);
        let generation = mirror.publish(executor.shared_state());

        tracing::debug!(
            agent = %self.agent_id,
            function_failed = failed,
            generation,
            "Memory consolidation finished"
        );
    }
}
