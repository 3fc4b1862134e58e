//! # Scripted Executors
//!
//! An [`Executor`] that plays back a queue of turns. Each turn can call linked
//! tools (the orchestrator's `wait_for_memory_update` included), edit the
//! executor's memory, sleep, wait on a [`Gate`], fail, or panic. When the
//! script runs out every further turn is a plain reply naming the agent and
//! the invocation number.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tandem_core::{
    AgentId, AgentRole, AgentState, ExecutionResult, Executor, ExecutorError, ExecutorFactory,
    SharedMemoryState, StepMessage, StepResult, Tool, ToolCall, TurnInput, UsageStatistics,
};

use crate::gate::{GATE_TIMEOUT, Gate};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Scripted turns panic on purpose; keep the probe readable afterwards.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A direct edit to the executor's own memory, applied before tool calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEdit {
    Append { label: String, text: String },
    Replace { label: String, old: String, new: String },
    Archival(String),
}

impl MemoryEdit {
    fn apply(&self, state: &mut SharedMemoryState) -> Result<(), String> {
        match self {
            MemoryEdit::Append { label, text } => state.append(label, text),
            MemoryEdit::Replace { label, old, new } => state.replace(label, old, new),
            MemoryEdit::Archival(text) => {
                state.insert_archival(text.clone());
                Ok(())
            }
        }
        .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Complete,
    /// `run_step` returns `Err(ExecutorError::Failed)`
    Fail(String),
    /// `run_step` panics with this message
    Panic(String),
}

/// One scripted executor turn.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    tool_calls: Vec<ToolCall>,
    reply: Option<String>,
    usage: UsageStatistics,
    heartbeat: bool,
    memory_edits: Vec<MemoryEdit>,
    delay: Option<Duration>,
    hold: Option<Gate>,
    started: Option<Gate>,
    outcome: TurnOutcome,
}

impl ScriptedTurn {
    /// A turn that emits nothing
    pub fn empty() -> Self {
        Self {
            tool_calls: Vec::new(),
            reply: None,
            usage: UsageStatistics::default(),
            heartbeat: false,
            memory_edits: Vec::new(),
            delay: None,
            hold: None,
            started: None,
            outcome: TurnOutcome::Complete,
        }
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            ..Self::empty()
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            outcome: TurnOutcome::Fail(reason.into()),
            ..Self::empty()
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            outcome: TurnOutcome::Panic(message.into()),
            ..Self::empty()
        }
    }

    /// Call a linked tool. Calls run in order, before the reply.
    pub fn call(mut self, name: impl Into<String>, input: impl Into<String>) -> Self {
        self.tool_calls.push(ToolCall::new(name, input));
        self
    }

    pub fn usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = UsageStatistics::new(prompt_tokens, completion_tokens);
        self
    }

    pub fn heartbeat(mut self) -> Self {
        self.heartbeat = true;
        self
    }

    pub fn edit(mut self, edit: MemoryEdit) -> Self {
        self.memory_edits.push(edit);
        self
    }

    pub fn append(self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.edit(MemoryEdit::Append {
            label: label.into(),
            text: text.into(),
        })
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hold the turn until `gate` opens (bounded by [`GATE_TIMEOUT`]).
    pub fn hold_until(mut self, gate: &Gate) -> Self {
        self.hold = Some(gate.clone());
        self
    }

    /// Open `gate` as soon as the turn starts.
    pub fn signal_start(mut self, gate: &Gate) -> Self {
        self.started = Some(gate.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    TurnStarted,
    TurnFinished,
    Synced { version: u64 },
    ToolCalled { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEvent {
    pub agent: String,
    pub invocation: usize,
    pub kind: EventKind,
}

/// Ordered event log shared by several executors, for cross-executor
/// ordering assertions.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<ProbeEvent>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: ProbeEvent) {
        lock(&self.events).push(event);
    }

    pub fn events(&self) -> Vec<ProbeEvent> {
        lock(&self.events).clone()
    }

    /// Index of the first event matching `agent`, `kind`, and `invocation`
    pub fn position(&self, agent: &str, invocation: usize, kind: &EventKind) -> Option<usize> {
        lock(&self.events)
            .iter()
            .position(|e| e.agent == agent && e.invocation == invocation && &e.kind == kind)
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    inputs: Vec<TurnInput>,
    synced: Vec<SharedMemoryState>,
    tool_results: Vec<(String, ExecutionResult)>,
    in_turn: bool,
}

/// Observes a [`ScriptedExecutor`] after it has been handed to an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ExecutorProbe {
    state: Arc<Mutex<ProbeState>>,
    timeline: Timeline,
}

impl ExecutorProbe {
    pub fn invocations(&self) -> usize {
        lock(&self.state).inputs.len()
    }

    pub fn inputs(&self) -> Vec<TurnInput> {
        lock(&self.state).inputs.clone()
    }

    pub fn sync_count(&self) -> usize {
        lock(&self.state).synced.len()
    }

    pub fn synced_states(&self) -> Vec<SharedMemoryState> {
        lock(&self.state).synced.clone()
    }

    pub fn last_synced(&self) -> Option<SharedMemoryState> {
        lock(&self.state).synced.last().cloned()
    }

    pub fn tool_results(&self) -> Vec<(String, ExecutionResult)> {
        lock(&self.state).tool_results.clone()
    }

    /// Whether a turn is running right now
    pub fn in_turn(&self) -> bool {
        lock(&self.state).in_turn
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    fn begin_turn(&self, agent: &str, input: &TurnInput) -> usize {
        let invocation = {
            let mut state = lock(&self.state);
            state.inputs.push(input.clone());
            state.in_turn = true;
            state.inputs.len()
        };
        self.timeline.record(ProbeEvent {
            agent: agent.to_string(),
            invocation,
            kind: EventKind::TurnStarted,
        });
        invocation
    }

    fn end_turn(&self, agent: &str, invocation: usize) {
        lock(&self.state).in_turn = false;
        self.timeline.record(ProbeEvent {
            agent: agent.to_string(),
            invocation,
            kind: EventKind::TurnFinished,
        });
    }

    fn record_tool(&self, agent: &str, invocation: usize, name: &str, result: &ExecutionResult) {
        lock(&self.state)
            .tool_results
            .push((name.to_string(), result.clone()));
        self.timeline.record(ProbeEvent {
            agent: agent.to_string(),
            invocation,
            kind: EventKind::ToolCalled {
                name: name.to_string(),
            },
        });
    }

    fn record_sync(&self, agent: &str, state: &SharedMemoryState) {
        let invocation = {
            let mut probe = lock(&self.state);
            probe.synced.push(state.clone());
            probe.inputs.len()
        };
        self.timeline.record(ProbeEvent {
            agent: agent.to_string(),
            invocation,
            kind: EventKind::Synced {
                version: state.version(),
            },
        });
    }
}

/// Plays back [`ScriptedTurn`]s.
pub struct ScriptedExecutor {
    id: AgentId,
    name: String,
    role: AgentRole,
    system: String,
    declared_tools: Vec<String>,
    tools: BTreeMap<String, Arc<dyn Tool>>,
    memory: Arc<Mutex<SharedMemoryState>>,
    script: VecDeque<ScriptedTurn>,
    probe: ExecutorProbe,
}

impl ScriptedExecutor {
    pub fn new(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: AgentId::generate(),
            name: name.into(),
            role,
            system: String::new(),
            declared_tools: Vec::new(),
            tools: BTreeMap::new(),
            memory: Arc::new(Mutex::new(SharedMemoryState::default())),
            script: VecDeque::new(),
            probe: ExecutorProbe::default(),
        }
    }

    pub fn conversation(name: impl Into<String>) -> Self {
        Self::new(name, AgentRole::Conversation)
    }

    pub fn memory(name: impl Into<String>) -> Self {
        Self::new(name, AgentRole::Memory)
    }

    /// Rebuild from persisted state; tools are declared, not linked.
    pub fn from_state(state: &AgentState) -> Self {
        Self {
            id: state.id.clone(),
            name: state.name.clone(),
            role: state.role,
            system: state.system.clone(),
            declared_tools: state.tools.clone(),
            tools: BTreeMap::new(),
            memory: Arc::new(Mutex::new(state.memory.clone())),
            script: VecDeque::new(),
            probe: ExecutorProbe::default(),
        }
    }

    #[must_use]
    pub fn with_turn(mut self, turn: ScriptedTurn) -> Self {
        self.script.push_back(turn);
        self
    }

    #[must_use]
    pub fn with_turns(mut self, turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        self.script.extend(turns);
        self
    }

    #[must_use]
    pub fn with_memory(self, memory: SharedMemoryState) -> Self {
        *lock(&self.memory) = memory;
        self
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Record events into a timeline shared with other executors.
    #[must_use]
    pub fn with_timeline(mut self, timeline: &Timeline) -> Self {
        self.probe.timeline = timeline.clone();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn declares_tool(&self, name: &str) -> bool {
        self.declared_tools.iter().any(|t| t == name)
    }

    pub fn probe(&self) -> ExecutorProbe {
        self.probe.clone()
    }

    /// The executor's own memory, for building memory tools that edit it.
    pub fn memory_handle(&self) -> Arc<Mutex<SharedMemoryState>> {
        Arc::clone(&self.memory)
    }

    fn call_tool(&self, invocation: usize, call: &ToolCall) -> Option<ExecutionResult> {
        let tool = self.tools.get(&call.name)?;
        let result = tool.call(call.input.clone());
        self.probe.record_tool(&self.name, invocation, &call.name, &result);
        Some(result)
    }
}

impl Executor for ScriptedExecutor {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn run_step(&mut self, input: &TurnInput) -> Result<StepResult, ExecutorError> {
        let invocation = self.probe.begin_turn(&self.name, input);
        let turn = self.script.pop_front().unwrap_or_else(|| {
            ScriptedTurn::reply(format!("{} turn {}", self.name, invocation))
        });

        if let Some(started) = &turn.started {
            started.open();
        }
        if let Some(delay) = turn.delay {
            thread::sleep(delay);
        }
        if let Some(hold) = &turn.hold {
            if !hold.wait(GATE_TIMEOUT) {
                tracing::warn!(agent = %self.name, "Scripted turn gate never opened");
            }
        }

        let mut messages = Vec::new();
        let mut function_failed = false;

        for edit in &turn.memory_edits {
            if let Err(error) = edit.apply(&mut lock(&self.memory)) {
                messages.push(StepMessage::tool(error));
                function_failed = true;
            }
        }

        for call in &turn.tool_calls {
            match self.call_tool(invocation, call) {
                Some(result) => messages.push(StepMessage::tool(result.output)),
                None => {
                    messages.push(StepMessage::tool(format!("unknown tool '{}'", call.name)));
                    function_failed = true;
                }
            }
        }

        match turn.outcome {
            TurnOutcome::Complete => {}
            TurnOutcome::Fail(reason) => {
                self.probe.end_turn(&self.name, invocation);
                return Err(ExecutorError::failed(&self.id, reason));
            }
            TurnOutcome::Panic(message) => {
                self.probe.end_turn(&self.name, invocation);
                panic!("{}", message);
            }
        }

        if let Some(reply) = turn.reply {
            messages.push(StepMessage::assistant(reply));
        }

        let mut result = StepResult::new(messages, turn.usage);
        result.function_failed = function_failed;
        result.heartbeat_requested = turn.heartbeat;

        self.probe.end_turn(&self.name, invocation);
        Ok(result)
    }

    fn sync_state(&mut self, state: &SharedMemoryState) {
        *lock(&self.memory) = state.clone();
        self.probe.record_sync(&self.name, state);
    }

    fn shared_state(&self) -> SharedMemoryState {
        lock(&self.memory).clone()
    }

    fn agent_state(&self) -> AgentState {
        let mut tools = self.declared_tools.clone();
        for name in self.tools.keys() {
            if !tools.contains(name) {
                tools.push(name.clone());
            }
        }
        AgentState::new(self.id.clone(), self.name.clone(), self.role)
            .with_system(self.system.clone())
            .with_tools(tools)
            .with_memory(self.shared_state())
    }

    fn link_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }
}

type SetupHook = Box<dyn Fn(&mut ScriptedExecutor)>;

/// Builds [`ScriptedExecutor`]s from agent states, with a script per role.
#[derive(Default)]
pub struct ScriptedExecutorFactory {
    scripts: Mutex<HashMap<AgentRole, Vec<ScriptedTurn>>>,
    probes: Mutex<HashMap<AgentRole, ExecutorProbe>>,
    built: Mutex<Vec<AgentState>>,
    failing: Option<AgentRole>,
    setup: Option<SetupHook>,
}

impl ScriptedExecutorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(self, role: AgentRole, turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        lock(&self.scripts).entry(role).or_default().extend(turns);
        self
    }

    /// Fail to build executors for `role`.
    #[must_use]
    pub fn failing_for(mut self, role: AgentRole) -> Self {
        self.failing = Some(role);
        self
    }

    /// Run `hook` on every executor after it is built, e.g. to link tools.
    #[must_use]
    pub fn with_setup(mut self, hook: impl Fn(&mut ScriptedExecutor) + 'static) -> Self {
        self.setup = Some(Box::new(hook));
        self
    }

    pub fn probe(&self, role: AgentRole) -> Option<ExecutorProbe> {
        lock(&self.probes).get(&role).cloned()
    }

    /// States passed to `build`, in call order
    pub fn built(&self) -> Vec<AgentState> {
        lock(&self.built).clone()
    }
}

impl ExecutorFactory for ScriptedExecutorFactory {
    fn build(&self, state: &AgentState) -> Result<Box<dyn Executor>, ExecutorError> {
        lock(&self.built).push(state.clone());
        if self.failing == Some(state.role) {
            return Err(ExecutorError::failed(&state.id, "scripted build failure"));
        }

        let turns = lock(&self.scripts).remove(&state.role).unwrap_or_default();
        let mut executor = ScriptedExecutor::from_state(state).with_turns(turns);
        if let Some(setup) = &self.setup {
            setup(&mut executor);
        }
        lock(&self.probes).insert(state.role, executor.probe());
        Ok(Box::new(executor))
    }
}
