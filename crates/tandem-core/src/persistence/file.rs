use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::StatePersister;
use crate::agent_state::AgentState;
use crate::error::PersistenceError;
use crate::identifiers::AgentId;

/// Stores each agent state as pretty JSON in `<dir>/<agent-id>.json`.
///
/// Writes go to a `.tmp` sibling first and are renamed into place, so a crash
/// mid-write leaves the previous state readable. Agent ids are validated
/// identifiers, which keeps the file name inside `dir`.
///
/// Two persisters pointing at the same directory may race on the same agent;
/// the orchestrator only ever persists a given agent from one thread at a time.
#[derive(Debug, Clone)]
pub struct FileStatePersister {
    dir: PathBuf,
}

impl FileStatePersister {
    /// Create the persister, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &AgentId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }
}

impl StatePersister for FileStatePersister {
    fn persist(&self, state: &AgentState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(state).map_err(|source| {
            PersistenceError::Serialization {
                agent: state.id.clone(),
                source,
            }
        })?;

        let path = self.path_for(&state.id);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, json).map_err(|source| {
            tracing::error!(path = ?tmp_path, error = %source, "Failed to write agent state");
            PersistenceError::Io {
                path: tmp_path.clone(),
                source,
            }
        })?;

        fs::rename(&tmp_path, &path).map_err(|source| {
            tracing::error!(path = ?path, error = %source, "Failed to move agent state into place");
            PersistenceError::Io {
                path: path.clone(),
                source,
            }
        })?;

        tracing::debug!(agent = %state.id, path = ?path, "Persisted agent state");
        Ok(())
    }

    fn load(&self, id: &AgentId) -> Result<Option<AgentState>, PersistenceError> {
        let path = self.path_for(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| PersistenceError::Serialization {
                agent: id.clone(),
                source,
            })
    }
}
