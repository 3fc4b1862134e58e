//! Builds a split agent: one parent state plus a conversation executor and a
//! memory executor derived from it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tandem_core::{
    AgentId, AgentRole, AgentState, ExecutorFactory, SharedMemoryState, StatePersister,
};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::SplitThreadOrchestrator;
use crate::tools::{WAIT_FOR_MEMORY_TOOL, is_memory_tool};

/// System prompt given to the conversation half of a split agent.
pub const CONVERSATION_SYSTEM_PROMPT: &str = "\
You handle the conversation with the user. A separate memory agent updates \
core memory in the background while you reply. If your answer depends on \
something the user just told you that is not in core memory yet, call \
wait_for_memory_update and you will be given the turn again with fresh memory.";

/// System prompt given to the memory half of a split agent.
pub const MEMORY_SYSTEM_PROMPT: &str = "\
You maintain long-term memory for a conversation you do not take part in. \
Read each new message and record anything worth keeping with \
core_memory_append, core_memory_replace, or archival_memory_insert. \
Do not reply to the user.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub memory: SharedMemoryState,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateAgentRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: String::new(),
            memory: SharedMemoryState::default(),
            tools: Vec::new(),
            description: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_memory(mut self, memory: SharedMemoryState) -> Self {
        self.memory = memory;
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

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The three states a split agent is made of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAgentStates {
    pub parent: AgentState,
    pub conversation: AgentState,
    pub memory: AgentState,
}

/// Derive the parent, conversation, and memory states from a request.
///
/// Memory-mutation tools go to the memory agent, everything else to the
/// conversation agent, which also gets `wait_for_memory_update`. The parent
/// keeps the request's system prompt and no tools.
pub fn split_agent_states(request: &CreateAgentRequest) -> OrchestratorResult<SplitAgentStates> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(OrchestratorError::InvalidRequest(
            "agent name cannot be empty".to_string(),
        ));
    }

    let (memory_tools, mut conversation_tools): (Vec<String>, Vec<String>) = request
        .tools
        .iter()
        .cloned()
        .partition(|tool| is_memory_tool(tool));
    conversation_tools.retain(|tool| tool != WAIT_FOR_MEMORY_TOOL);
    conversation_tools.push(WAIT_FOR_MEMORY_TOOL.to_string());

    let derived = |suffix: &str, role: AgentRole, system: &str, tools: Vec<String>| {
        AgentState::new(AgentId::generate(), format!("{}_{}", name, suffix), role)
            .with_system(system)
            .with_tools(tools)
            .with_memory(request.memory.clone())
            .with_description(request.description.clone())
    };

    Ok(SplitAgentStates {
        parent: AgentState::new(AgentId::generate(), name, AgentRole::Parent)
            .with_system(request.system.clone())
            .with_memory(request.memory.clone())
            .with_description(request.description.clone()),
        conversation: derived(
            "conversation",
            AgentRole::Conversation,
            CONVERSATION_SYSTEM_PROMPT,
            conversation_tools,
        ),
        memory: derived("memory", AgentRole::Memory, MEMORY_SYSTEM_PROMPT, memory_tools),
    })
}

/// Build a ready orchestrator for a new split agent.
///
/// Nothing is persisted here; call [`save_split_thread_agent`] once the agent
/// should outlive the process.
pub fn create_split_thread_agent(
    request: &CreateAgentRequest,
    factory: &dyn ExecutorFactory,
    persister: Arc<dyn StatePersister>,
    config: OrchestratorConfig,
) -> OrchestratorResult<SplitThreadOrchestrator> {
    let states = split_agent_states(request)?;

    let conversation = factory.build(&states.conversation)?;
    let memory = factory.build(&states.memory)?;

    tracing::info!(
        parent = %states.parent.id,
        conversation = %states.conversation.id,
        memory = %states.memory.id,
        conversation_tools = states.conversation.tools.len(),
        memory_tools = states.memory.tools.len(),
        "Created split-thread agent"
    );

    SplitThreadOrchestrator::builder(conversation, memory)
        .parent(states.parent)
        .persister(persister)
        .config(config)
        .build()
}

/// Persist all three states and return the refreshed parent.
pub fn save_split_thread_agent(agent: &SplitThreadOrchestrator) -> OrchestratorResult<AgentState> {
    agent.save_all()?;
    Ok(agent.update_state())
}
