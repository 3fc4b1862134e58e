//! # Tandem Core
//!
//! Data model and collaborator traits for the tandem dual-worker step
//! orchestrator. Nothing in this crate spawns threads; it defines what the
//! runtime moves between them.
//!
//! - [`StepResult`]: the mergeable record of one executor invocation
//! - [`SharedMemoryState`]: the core memory both workers read and only the
//!   memory worker writes durably
//! - [`Executor`] / [`Tool`]: the opaque reasoning worker and the tools it may call
//! - [`StatePersister`]: where executor state goes after each turn

pub mod agent_state;
pub mod error;
pub mod executor;
pub mod identifiers;
pub mod input;
pub mod memory;
pub mod message;
pub mod persistence;
pub mod step;
pub mod tool;
pub mod usage;

pub use agent_state::{AgentRole, AgentState};
pub use error::{ExecutorError, InputError, MemoryError, PersistenceError};
pub use executor::{Executor, ExecutorFactory};
pub use identifiers::{AgentId, IdValidationError, StepId};
pub use input::TurnInput;
pub use memory::{MemoryBlock, SharedMemoryState};
pub use message::{MessageRole, StepMessage};
pub use persistence::{FileStatePersister, InMemoryStatePersister, StatePersister};
pub use step::StepResult;
pub use tool::{ExecutionResult, Tool, ToolCall};
pub use usage::UsageStatistics;
