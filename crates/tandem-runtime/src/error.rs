//! Orchestrator errors.
//!
//! `step` returns `Err` only for precondition violations. Executor failures
//! and rendezvous timeouts are carried inside the returned
//! [`StepResult`](tandem_core::StepResult) instead.

use std::time::Duration;

use tandem_core::{ExecutorError, InputError, PersistenceError};

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Invalid step input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("Invalid agent request: {0}")]
    InvalidRequest(String),

    #[error("Previous memory consolidation still running after {waited:?}")]
    ConsolidationInFlight { waited: Duration },

    #[error("Failed to spawn memory worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Executor construction failed: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
