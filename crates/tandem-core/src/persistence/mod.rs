//! Durable storage of executor state.
//!
//! The orchestrator saves an executor's [`AgentState`] at the end of each of
//! its turns so a crash between steps loses at most the turn in flight.

mod file;
mod in_memory;

pub use file::FileStatePersister;
pub use in_memory::InMemoryStatePersister;

use crate::agent_state::AgentState;
use crate::error::PersistenceError;
use crate::identifiers::AgentId;

pub trait StatePersister: Send + Sync {
    fn persist(&self, state: &AgentState) -> Result<(), PersistenceError>;

    fn load(&self, id: &AgentId) -> Result<Option<AgentState>, PersistenceError>;

    /// Load a state that must exist
    fn load_required(&self, id: &AgentId) -> Result<AgentState, PersistenceError> {
        self.load(id)?
            .ok_or_else(|| PersistenceError::NotFound { agent: id.clone() })
    }
}
