use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tandem_core::{
    AgentId, AgentRole, AgentState, InMemoryStatePersister, PersistenceError, StatePersister,
};

/// One call to [`StatePersister::persist`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistRecord {
    pub agent: AgentId,
    pub role: AgentRole,
    pub memory_version: u64,
}

/// Stores states in memory and remembers every save in order.
///
/// Clones share the same log and store.
#[derive(Clone, Default)]
pub struct RecordingPersister {
    store: InMemoryStatePersister,
    log: Arc<Mutex<Vec<PersistRecord>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `persist` fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<PersistRecord> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count_for(&self, role: AgentRole) -> usize {
        self.records().iter().filter(|r| r.role == role).count()
    }
}

impl StatePersister for RecordingPersister {
    fn persist(&self, state: &AgentState) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io {
                path: format!("memory://{}", state.id).into(),
                source: std::io::Error::other("writes disabled"),
            });
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PersistRecord {
                agent: state.id.clone(),
                role: state.role,
                memory_version: state.memory.version(),
            });
        self.store.persist(state)
    }

    fn load(&self, id: &AgentId) -> Result<Option<AgentState>, PersistenceError> {
        self.store.load(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AgentRole::Conversation)]
    #[case(AgentRole::Memory)]
    fn test_records_and_stores(#[case] role: AgentRole) {
        let persister = RecordingPersister::new();
        let state = AgentState::new(AgentId::generate(), "agent", role);

        persister.persist(&state).unwrap();

        assert_eq!(persister.count_for(role), 1);
        assert_eq!(persister.load(&state.id).unwrap(), Some(state));
    }

    #[test]
    fn test_failing_writes_are_not_recorded() {
        let persister = RecordingPersister::new();
        persister.fail_writes(true);
        let state = AgentState::new(AgentId::generate(), "agent", AgentRole::Memory);

        assert!(persister.persist(&state).is_err());
        assert!(persister.records().is_empty());
    }
}
