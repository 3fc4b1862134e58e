//! # Tandem Testing
//!
//! Deterministic stand-ins for the collaborators the orchestrator talks to.
//!
//! - **ScriptedExecutor**: plays back a queue of [`ScriptedTurn`]s, calling
//!   linked tools by name, so a test decides exactly when a conversation turn
//!   parks or a memory turn finishes
//! - **ExecutorProbe**: a cloneable view of what a scripted executor saw
//!   (inputs, syncs, turn boundaries) that stays usable after the executor
//!   has been moved into an orchestrator
//! - **Gate**: a one-shot latch for holding a turn until the test releases it
//! - **RecordingPersister**: a persister that remembers every save in order
//!
//! ## Usage
//!
//! ```rust
//! use tandem_core::{Executor, TurnInput};
//! use tandem_testing::{ScriptedExecutor, ScriptedTurn};
//!
//! let mut executor = ScriptedExecutor::conversation("chat")
//!     .with_turn(ScriptedTurn::reply("hello"));
//! let probe = executor.probe();
//!
//! let result = executor.run_step(&TurnInput::user("hi")).unwrap();
//! assert_eq!(result.messages[0].content, "hello");
//! assert_eq!(probe.invocations(), 1);
//! ```

pub mod gate;
pub mod persister;
pub mod scripted;

pub use gate::Gate;
pub use persister::{PersistRecord, RecordingPersister};
pub use scripted::{
    EventKind, ExecutorProbe, MemoryEdit, ProbeEvent, ScriptedExecutor, ScriptedExecutorFactory,
    ScriptedTurn, Timeline, TurnOutcome,
};
