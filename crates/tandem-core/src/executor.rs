//! # Executor
//!
//! A single stateful reasoning worker. The orchestrator treats one
//! [`Executor::run_step`] as an opaque, possibly slow, possibly retrying call;
//! prompt construction, tool dispatch and token accounting all live behind it.
//!
//! Executors are not assumed to be safe for concurrent turns. The runtime
//! keeps each one behind its own mutex and only requires `Send`.

use std::sync::Arc;

use crate::agent_state::AgentState;
use crate::error::ExecutorError;
use crate::identifiers::AgentId;
use crate::input::TurnInput;
use crate::memory::SharedMemoryState;
use crate::step::StepResult;
use crate::tool::Tool;

pub trait Executor: Send {
    fn id(&self) -> &AgentId;

    /// Run one turn. May block, call linked tools, and retry internally.
    fn run_step(&mut self, input: &TurnInput) -> Result<StepResult, ExecutorError>;

    /// Replace this executor's view of shared memory and re-derive any prompt
    /// context from it. Must be idempotent.
    fn sync_state(&mut self, state: &SharedMemoryState);

    /// Snapshot of this executor's current view of shared memory.
    fn shared_state(&self) -> SharedMemoryState;

    /// Snapshot of everything needed to persist and later rebuild this executor.
    fn agent_state(&self) -> AgentState;

    /// Make a tool available to subsequent turns.
    fn link_tool(&mut self, tool: Arc<dyn Tool>);
}

/// Builds executors from persisted state.
pub trait ExecutorFactory {
    fn build(&self, state: &AgentState) -> Result<Box<dyn Executor>, ExecutorError>;
}
