//! Persistable description of one executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifiers::AgentId;
use crate::memory::SharedMemoryState;

/// Which part of a split agent a state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// The user-visible agent that owns the two workers
    Parent,
    Conversation,
    Memory,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentRole::Parent => "parent",
            AgentRole::Conversation => "conversation",
            AgentRole::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub name: String,
    pub role: AgentRole,
    pub system: String,
    pub tools: Vec<String>,
    pub memory: SharedMemoryState,
    #[serde(default)]
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    pub fn new(id: AgentId, name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            system: String::new(),
            tools: Vec::new(),
            memory: SharedMemoryState::default(),
            description: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_memory(mut self, memory: SharedMemoryState) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    /// Stamp `updated_at` with the current time
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
