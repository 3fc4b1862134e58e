//! # Split-Thread Orchestrator
//!
//! Drives one logical step across the two workers and returns a single
//! merged [`StepResult`].
//!
//! 1. Wait for the previous memory worker (bounded by `launch_timeout`),
//!    open a rendezvous epoch, spawn the memory worker.
//! 2. Under the conversation lock, bind the turn to that epoch and run the
//!    conversation executor. If it parked on the rendezvous through
//!    `wait_for_memory_update`, run it exactly once more and merge both
//!    outputs.
//! 3. Drain the pending memory slot. If the memory worker already finished,
//!    its output goes first; otherwise it surfaces on a later step.
//!
//! Step latency is bounded by the conversation turn, not by consolidation,
//! unless the conversation turn chose to wait.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tandem_core::{
    AgentId, AgentRole, AgentState, Executor, InMemoryStatePersister, StatePersister, StepId,
    StepResult, TurnInput,
};
use tracing::{Span, info_span};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::mirror::SharedStateMirror;
use crate::pending::PendingMemoryResult;
use crate::phase::{StepPhase, StepTracker};
use crate::rendezvous::Rendezvous;
use crate::tools::WaitForMemoryTool;
use crate::worker::{ConversationWorker, MemoryWorker};

/// State the memory thread needs; everything else stays on the caller side.
struct MemoryShared {
    rendezvous: Arc<Rendezvous>,
    pending: PendingMemoryResult,
    mirror: SharedStateMirror,
    worker: MemoryWorker,
}

pub struct SplitThreadOrchestrator {
    shared: Arc<MemoryShared>,
    conversation: ConversationWorker,
    /// Handle of the most recently launched memory worker. Holding this lock
    /// serializes launches.
    memory_thread: Mutex<Option<JoinHandle<()>>>,
    parent: Mutex<AgentState>,
    persister: Arc<dyn StatePersister>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for SplitThreadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitThreadOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SplitThreadOrchestrator {
    pub fn builder(
        conversation: Box<dyn Executor>,
        memory: Box<dyn Executor>,
    ) -> SplitThreadOrchestratorBuilder {
        SplitThreadOrchestratorBuilder::new(conversation, memory)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn conversation_agent_id(&self) -> &AgentId {
        self.conversation.agent_id()
    }

    pub fn memory_agent_id(&self) -> &AgentId {
        self.shared.worker.agent_id()
    }

    /// Run one logical step.
    ///
    /// Returns `Err` only for precondition violations: invalid input, a
    /// previous memory worker still running past `launch_timeout`, or a failed
    /// thread spawn. Executor failures come back as `function_failed`.
    pub fn step(&self, input: TurnInput) -> OrchestratorResult<StepResult> {
        input.validate()?;

        let step_id = StepId::new();
        let span = info_span!(
            "orchestrator_step",
            step_id = %step_id,
            conversation = %self.conversation.agent_id(),
            memory = %self.shared.worker.agent_id(),
        );
        let _entered = span.enter();
        let mut tracker = StepTracker::new(step_id);

        let input = Arc::new(input);
        let epoch = self.launch_memory_worker(Arc::clone(&input), &span)?;
        tracker.advance(StepPhase::MemoryLaunched);

        let (conversation, degraded) = {
            let mut turn = self.conversation.begin_turn();
            // A later step may already have launched; park on this step's worker.
            self.shared.rendezvous.bind_turn(epoch);

            tracker.advance(StepPhase::ConversationRunning);
            let mut result = turn.invoke(&input, &self.shared.mirror);

            if self.shared.rendezvous.take_waited() {
                tracker.advance(StepPhase::ConversationRetrying);
                let retry = turn.invoke(&input, &self.shared.mirror);
                result = result.merge(retry);
                // a second wait inside the retry does not earn another turn
                self.shared.rendezvous.take_waited();
            }

            (result, self.shared.rendezvous.take_degraded())
        };

        tracker.advance(StepPhase::Merging);
        let mut result = match self.shared.pending.take() {
            Some(memory) => memory.merge(conversation),
            None => {
                tracing::debug!("Memory consolidation still running, result deferred to a later step");
                conversation
            }
        };
        result.degraded_consolidation |= degraded;
        tracker.advance(StepPhase::Done);

        tracing::info!(
            retried = tracker.retried(),
            messages = result.messages.len(),
            function_failed = result.function_failed,
            degraded_consolidation = result.degraded_consolidation,
            total_tokens = result.usage.total_tokens,
            "Step complete"
        );
        Ok(result)
    }

    fn lock_memory_thread(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.memory_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn this step's memory worker and return its rendezvous epoch.
    fn launch_memory_worker(&self, input: Arc<TurnInput>, span: &Span) -> OrchestratorResult<u64> {
        let mut slot = self.lock_memory_thread();

        if let Some(previous) = slot.take() {
            if !self
                .shared
                .rendezvous
                .wait_finished(self.config.launch_timeout)
            {
                *slot = Some(previous);
                let waited = self.config.launch_timeout.unwrap_or_default();
                tracing::warn!(?waited, "Previous memory worker still running, refusing to launch");
                return Err(OrchestratorError::ConsolidationInFlight { waited });
            }
            join_memory_thread(previous);
        }

        let epoch = self.shared.rendezvous.launch();

        let shared = Arc::clone(&self.shared);
        let worker_span = info_span!(parent: span, "memory_worker");
        let handle = thread::Builder::new()
            .name(self.config.memory_thread_name.clone())
            .spawn(move || {
                let _entered = worker_span.enter();
                shared.worker.consolidate(
                    &input,
                    &shared.pending,
                    &shared.mirror,
                    &shared.rendezvous,
                );
            })
            .map_err(|error| {
                // Nothing will signal this step; don't leave the next launch waiting.
                self.shared.rendezvous.signal();
                OrchestratorError::WorkerSpawn(error)
            })?;

        *slot = Some(handle);
        Ok(epoch)
    }

    /// Wait for the last memory worker (bounded by `launch_timeout`) and join it.
    /// Returns false if it was still running.
    fn join_last_memory_worker(&self) -> bool {
        let mut slot = self.lock_memory_thread();
        let Some(handle) = slot.take() else {
            return true;
        };
        if self
            .shared
            .rendezvous
            .wait_finished(self.config.launch_timeout)
        {
            join_memory_thread(handle);
            true
        } else {
            tracing::warn!("Memory worker did not finish in time, leaving it detached");
            false
        }
    }

    /// Drain a memory result that no step has claimed yet.
    pub fn take_pending_memory(&self) -> Option<StepResult> {
        self.shared.pending.take()
    }

    pub fn has_pending_memory(&self) -> bool {
        self.shared.pending.is_pending()
    }

    /// The conversation worker's current mirror of shared memory.
    pub fn shared_memory(&self) -> tandem_core::SharedMemoryState {
        self.shared.mirror.snapshot()
    }

    /// Parent agent state with its memory refreshed from the mirror.
    pub fn update_state(&self) -> AgentState {
        self.refresh_parent(self.shared.mirror.snapshot())
    }

    fn refresh_parent(&self, memory: tandem_core::SharedMemoryState) -> AgentState {
        let mut parent = self.parent.lock().unwrap_or_else(PoisonError::into_inner);
        parent.memory = memory;
        parent.touch();
        parent.clone()
    }

    /// Persist parent, conversation, and memory states.
    ///
    /// Waits for any conversation turn or consolidation in progress. The
    /// conversation executor is synced to the mirror first, and the parent
    /// takes the same memory, so the saved states agree.
    pub fn save_all(&self) -> OrchestratorResult<()> {
        let mut conversation = {
            let mut turn = self.conversation.begin_turn();
            turn.sync_from(&self.shared.mirror);
            turn.agent_state()
        };
        let parent = self.refresh_parent(conversation.memory.clone());
        self.persister.persist(&parent)?;

        conversation.touch();
        self.persister.persist(&conversation)?;

        let mut memory = self.shared.worker.agent_state();
        memory.touch();
        self.persister.persist(&memory)?;

        tracing::info!(
            parent = %parent.id,
            conversation = %conversation.id,
            memory = %memory.id,
            "Saved split agent"
        );
        Ok(())
    }

    /// Join the last memory worker and hand back any unclaimed memory output.
    pub fn shutdown(self) -> Option<StepResult> {
        self.join_last_memory_worker();
        self.shared.pending.take()
    }
}

impl Drop for SplitThreadOrchestrator {
    fn drop(&mut self) {
        self.join_last_memory_worker();
    }
}

fn join_memory_thread(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("Memory worker thread panicked outside the executor turn");
    }
}

/// Builder for [`SplitThreadOrchestrator`]
pub struct SplitThreadOrchestratorBuilder {
    conversation: Box<dyn Executor>,
    memory: Box<dyn Executor>,
    parent: Option<AgentState>,
    persister: Option<Arc<dyn StatePersister>>,
    config: OrchestratorConfig,
}

impl SplitThreadOrchestratorBuilder {
    pub fn new(conversation: Box<dyn Executor>, memory: Box<dyn Executor>) -> Self {
        Self {
            conversation,
            memory,
            parent: None,
            persister: None,
            config: OrchestratorConfig::default(),
        }
    }

    #[must_use]
    pub fn parent(mut self, parent: AgentState) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn persister(mut self, persister: Arc<dyn StatePersister>) -> Self {
        self.persister = Some(persister);
        self
    }

    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> OrchestratorResult<SplitThreadOrchestrator> {
        self.config.validate()?;

        let persister: Arc<dyn StatePersister> = self
            .persister
            .unwrap_or_else(|| Arc::new(InMemoryStatePersister::new()));
        let turn_persister = self
            .config
            .persist_agent_state
            .then(|| Arc::clone(&persister));

        let mut conversation = self.conversation;
        let rendezvous = Arc::new(Rendezvous::new());
        conversation.link_tool(Arc::new(WaitForMemoryTool::new(
            Arc::clone(&rendezvous),
            self.config.rendezvous_timeout,
        )));

        let mirror = SharedStateMirror::new(conversation.shared_state());
        let parent = self.parent.unwrap_or_else(|| {
            AgentState::new(AgentId::generate(), "split-agent", AgentRole::Parent)
                .with_memory(mirror.snapshot())
        });

        tracing::debug!(
            parent = %parent.id,
            conversation = %conversation.id(),
            memory = %self.memory.id(),
            "Built split-thread orchestrator"
        );

        Ok(SplitThreadOrchestrator {
            shared: Arc::new(MemoryShared {
                rendezvous,
                pending: PendingMemoryResult::new(),
                mirror,
                worker: MemoryWorker::new(self.memory, turn_persister.clone()),
            }),
            conversation: ConversationWorker::new(conversation, turn_persister),
            memory_thread: Mutex::new(None),
            parent: Mutex::new(parent),
            persister,
            config: self.config,
        })
    }
}
