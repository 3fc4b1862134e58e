//! # Tandem Runtime
//!
//! Runs two stateful executors per logical step: a memory executor on a
//! dedicated background thread and a conversation executor on the calling
//! thread. The conversation executor may block on the memory worker from
//! inside its own turn through the `wait_for_memory_update` tool; when it does,
//! its turn is repeated once against the refreshed memory.
//!
//! ```text
//!   caller thread                          memory thread
//!   ─────────────                          ─────────────
//!   Rendezvous::launch
//!   spawn ───────────────────────────────▶ Executor::run_step
//!   lock conversation                      persist memory state
//!   Executor::run_step                     deposit into pending slot
//!     └─ wait_for_memory_update ─ park ◀── publish mirror, signal
//!   (retry once if parked)
//!   unlock conversation
//!   merge(pending memory, conversation)
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod mirror;
pub mod orchestrator;
pub mod pending;
pub mod phase;
pub mod rendezvous;
pub mod tools;
pub mod worker;

pub use config::{ConfigError, OrchestratorConfig, OrchestratorConfigBuilder};
pub use error::{OrchestratorError, OrchestratorResult};
pub use factory::{
    CONVERSATION_SYSTEM_PROMPT, CreateAgentRequest, MEMORY_SYSTEM_PROMPT, SplitAgentStates,
    create_split_thread_agent, save_split_thread_agent, split_agent_states,
};
pub use mirror::SharedStateMirror;
pub use orchestrator::{SplitThreadOrchestrator, SplitThreadOrchestratorBuilder};
pub use pending::PendingMemoryResult;
pub use phase::{StepPhase, StepTracker};
pub use rendezvous::{ParkOutcome, Rendezvous};
pub use tools::{
    ArchivalMemoryInsert, CoreMemoryAppend, CoreMemoryReplace, MEMORY_TOOLS, MemoryHandle,
    WAIT_FOR_MEMORY_TOOL, WaitForMemoryTool,
};
pub use worker::{ConversationTurn, ConversationWorker, MemoryWorker};
