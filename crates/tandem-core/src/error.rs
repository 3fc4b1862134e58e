//! Error Types
//!
//! Errors for the collaborators the orchestrator talks to. None of these
//! cross a thread boundary as an `Err`: a failing executor turn is folded into
//! [`StepResult::function_failed`](crate::StepResult) by the worker that ran it.

use std::path::PathBuf;

use crate::identifiers::AgentId;

/// Failure of a single executor invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("Executor '{agent}' failed: {reason}")]
    Failed { agent: AgentId, reason: String },

    #[error("Executor '{agent}' produced malformed output: {details}")]
    MalformedOutput { agent: AgentId, details: String },

    #[error("Executor '{agent}' panicked: {message}")]
    Panicked { agent: AgentId, message: String },
}

impl ExecutorError {
    pub fn failed(agent: &AgentId, reason: impl Into<String>) -> Self {
        Self::Failed {
            agent: agent.clone(),
            reason: reason.into(),
        }
    }

    pub fn agent(&self) -> &AgentId {
        match self {
            Self::Failed { agent, .. }
            | Self::MalformedOutput { agent, .. }
            | Self::Panicked { agent, .. } => agent,
        }
    }
}

/// Rejected mutation of [`SharedMemoryState`](crate::SharedMemoryState).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("Unknown memory block '{label}'")]
    UnknownBlock { label: String },

    #[error("Memory block '{label}' would hold {length} chars, limit is {limit}")]
    LimitExceeded {
        label: String,
        length: usize,
        limit: usize,
    },

    #[error("Text to replace not found in memory block '{label}'")]
    TextNotFound { label: String },
}

/// Precondition violations on a step's input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Turn input contains no messages")]
    Empty,

    #[error("Message {index} has blank content")]
    BlankMessage { index: usize },

    #[error("Message {index} is too large ({size} bytes, max {max_size})")]
    TooLarge {
        index: usize,
        size: usize,
        max_size: usize,
    },
}

/// Failure to save or load an [`AgentState`](crate::AgentState).
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error for agent '{agent}': {source}")]
    Serialization {
        agent: AgentId,
        #[source]
        source: serde_json::Error,
    },

    #[error("No persisted state for agent '{agent}'")]
    NotFound { agent: AgentId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_error_display_names_agent() {
        let agent = AgentId::parse("bot_memory").unwrap();
        let err = ExecutorError::failed(&agent, "rate limited");
        assert_eq!(err.agent(), &agent);
        let text = err.to_string();
        assert!(text.contains("bot_memory"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn test_memory_error_display() {
        let err = MemoryError::LimitExceeded {
            label: "human".to_string(),
            length: 12,
            limit: 10,
        };
        assert!(err.to_string().contains("limit is 10"));
    }
}
