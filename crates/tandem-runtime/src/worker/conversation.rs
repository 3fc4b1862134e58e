use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tandem_core::{
    AgentId, AgentRole, AgentState, Executor, StatePersister, StepResult, Tool, TurnInput,
};

use super::{persist_state, run_guarded};
use crate::mirror::SharedStateMirror;

struct ConversationSlot {
    executor: Box<dyn Executor>,
    /// Mirror generation the executor was last synced to
    synced_generation: u64,
}

/// Owns the user-facing executor.
///
/// The mutex around the executor is the per-orchestrator conversation lock:
/// only one step's conversation turn (first invocation plus optional retry)
/// runs at a time, while memory consolidation proceeds independently.
pub struct ConversationWorker {
    slot: Mutex<ConversationSlot>,
    agent_id: AgentId,
    persister: Option<Arc<dyn StatePersister>>,
}

impl ConversationWorker {
    pub fn new(executor: Box<dyn Executor>, persister: Option<Arc<dyn StatePersister>>) -> Self {
        let agent_id = executor.id().clone();
        Self {
            slot: Mutex::new(ConversationSlot {
                executor,
                synced_generation: 0,
            }),
            agent_id,
            persister,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    fn lock(&self) -> MutexGuard<'_, ConversationSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn link_tool(&self, tool: Arc<dyn Tool>) {
        self.lock().executor.link_tool(tool);
    }

    /// Enter the conversation critical section. Blocks while another step's
    /// turn holds it.
    pub fn begin_turn(&self) -> ConversationTurn<'_> {
        ConversationTurn {
            slot: self.lock(),
            worker: self,
            invocations: 0,
        }
    }

    /// Blocks while a conversation turn is running.
    pub fn agent_state(&self) -> AgentState {
        self.lock().executor.agent_state()
    }
}

/// Exclusive access to the conversation executor for one step.
pub struct ConversationTurn<'a> {
    slot: MutexGuard<'a, ConversationSlot>,
    worker: &'a ConversationWorker,
    invocations: usize,
}

impl ConversationTurn<'_> {
    /// Push the mirror into the executor if it changed since the last sync.
    pub fn sync_from(&mut self, mirror: &SharedStateMirror) -> bool {
        let Some((generation, state)) = mirror.snapshot_if_newer(self.slot.synced_generation)
        else {
            return false;
        };

        self.slot.executor.sync_state(&state);
        self.slot.synced_generation = generation;
        persist_state(self.worker.persister.as_ref(), &*self.slot.executor);

        tracing::debug!(
            agent = %self.worker.agent_id,
            generation,
            memory_version = state.version(),
            "Synced conversation executor to consolidated memory"
        );
        true
    }

    /// Run the conversation executor once against the freshest mirror.
    pub fn invoke(&mut self, input: &TurnInput, mirror: &SharedStateMirror) -> StepResult {
        self.sync_from(mirror);
        self.invocations += 1;

        let slot = &mut *self.slot;
        let result = run_guarded(&mut *slot.executor, input, AgentRole::Conversation);
        persist_state(self.worker.persister.as_ref(), &*slot.executor);
        result
    }

    pub fn invocations(&self) -> usize {
        self.invocations
    }

    pub fn agent_state(&self) -> AgentState {
        self.slot.executor.agent_state()
    }

    pub fn synced_generation(&self) -> u64 {
        self.slot.synced_generation
    }
}
