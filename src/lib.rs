//! # Tandem
//!
//! A dual-worker step orchestrator for long-lived conversational agents. Each
//! logical step runs a conversation executor on the calling thread while a
//! memory executor consolidates long-term memory on a background thread, and
//! the two outputs come back as one merged [`StepResult`].
//!
//! ## Core Components
//!
//! - **[SplitThreadOrchestrator]**: drives one step and merges partial results
//! - **[Executor]**: the opaque stateful worker the orchestrator runs twice per step
//! - **[WaitForMemoryTool]**: the blocking tool that lets a conversation turn
//!   wait for consolidation from inside its own decision loop
//! - **[StatePersister]**: where executor state is saved after each turn
//!
//! ## Quick Start
//!
//! ```rust
//! use tandem_workspace::{SplitThreadOrchestrator, TurnInput, WAIT_FOR_MEMORY_TOOL};
//! use tandem_testing::{ScriptedExecutor, ScriptedTurn};
//!
//! let conversation = ScriptedExecutor::conversation("sam_conversation")
//!     .with_turn(ScriptedTurn::empty().call(WAIT_FOR_MEMORY_TOOL, "{}"))
//!     .with_turn(ScriptedTurn::reply("Nice to meet you, Ada."));
//! let memory = ScriptedExecutor::memory("sam_memory")
//!     .with_turn(ScriptedTurn::reply("noted: name is Ada"));
//!
//! let orchestrator =
//!     SplitThreadOrchestrator::builder(Box::new(conversation), Box::new(memory)).build()?;
//! let result = orchestrator.step(TurnInput::user("Hi, I'm Ada"))?;
//!
//! // memory output first, then both conversation invocations
//! assert_eq!(result.messages.first().unwrap().content, "noted: name is Ada");
//! assert_eq!(result.messages.last().unwrap().content, "Nice to meet you, Ada.");
//! # Ok::<(), tandem_workspace::OrchestratorError>(())
//! ```

pub use tandem_core as core;
pub use tandem_observability as observability;
pub use tandem_runtime as runtime;

pub use tandem_core::{
    AgentId, AgentRole, AgentState, ExecutionResult, Executor, ExecutorError, ExecutorFactory,
    FileStatePersister, InMemoryStatePersister, MessageRole, SharedMemoryState, StatePersister,
    StepMessage, StepResult, Tool, ToolCall, TurnInput, UsageStatistics,
};
pub use tandem_observability::{TracingConfig, init_tracing};
pub use tandem_runtime::{
    CreateAgentRequest, OrchestratorConfig, OrchestratorError, SplitThreadOrchestrator,
    WAIT_FOR_MEMORY_TOOL, WaitForMemoryTool, create_split_thread_agent, save_split_thread_agent,
};
