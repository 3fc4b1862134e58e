use dashmap::DashMap;
use std::sync::Arc;

use super::StatePersister;
use crate::agent_state::AgentState;
use crate::error::PersistenceError;
use crate::identifiers::AgentId;

/// Transient persister for tests and single-process deployments.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryStatePersister {
    states: Arc<DashMap<AgentId, AgentState>>,
}

impl InMemoryStatePersister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl StatePersister for InMemoryStatePersister {
    fn persist(&self, state: &AgentState) -> Result<(), PersistenceError> {
        self.states.insert(state.id.clone(), state.clone());
        Ok(())
    }

    fn load(&self, id: &AgentId) -> Result<Option<AgentState>, PersistenceError> {
        Ok(self.states.get(id).map(|entry| entry.value().clone()))
    }
}
