//! Property-Based Tests for Step Orchestration
//!
//! Invariants that must hold for any sequence of steps: the conversation
//! executor runs at most twice per step, memory output is never dropped, and
//! memory output always precedes the conversation output it is merged with.

use proptest::prelude::*;
use std::time::Duration;
use tandem_core::{StepMessage, StepResult, TurnInput, UsageStatistics};
use tandem_runtime::{
    OrchestratorConfig, PendingMemoryResult, SplitThreadOrchestrator, WAIT_FOR_MEMORY_TOOL,
};
use tandem_testing::{ScriptedExecutor, ScriptedTurn};

const MEMORY_PREFIX: &str = "mem turn";

fn is_memory(message: &StepMessage) -> bool {
    message.content.starts_with(MEMORY_PREFIX)
}

fn result_strategy() -> impl Strategy<Value = StepResult> {
    (
        prop::collection::vec("[a-z]{1,8}", 0..3),
        any::<bool>(),
        any::<bool>(),
        0u64..1000,
        0u64..1000,
    )
        .prop_map(|(texts, heartbeat, failed, prompt, completion)| {
            let mut result = StepResult::new(
                texts.into_iter().map(StepMessage::assistant).collect(),
                UsageStatistics::new(prompt, completion),
            );
            result.heartbeat_requested = heartbeat;
            result.function_failed = failed;
            result
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: invocation count per step is 2 exactly when the turn waited
    #[test]
    fn prop_conversation_runs_at_most_twice_per_step(waits in prop::collection::vec(any::<bool>(), 1..6)) {
        let turns = waits.iter().enumerate().flat_map(|(step, &wait)| {
            let reply = ScriptedTurn::reply(format!("reply {}", step));
            if wait {
                vec![ScriptedTurn::empty().call(WAIT_FOR_MEMORY_TOOL, "{}"), reply]
            } else {
                vec![reply]
            }
        });
        let conversation = ScriptedExecutor::conversation("chat").with_turns(turns);
        let probe = conversation.probe();
        let config = OrchestratorConfig::builder()
            .rendezvous_timeout(Some(Duration::from_secs(5)))
            .launch_timeout(Some(Duration::from_secs(5)))
            .persist_agent_state(false)
            .build()
            .unwrap();
        let orchestrator = SplitThreadOrchestrator::builder(
            Box::new(conversation),
            Box::new(ScriptedExecutor::memory("mem")),
        )
        .config(config)
        .build()
        .unwrap();

        let mut memory_messages = 0;
        for (step, &wait) in waits.iter().enumerate() {
            let before = probe.invocations();
            let result = orchestrator.step(TurnInput::user(format!("input {}", step))).unwrap();
            let ran = probe.invocations() - before;

            prop_assert_eq!(ran, if wait { 2 } else { 1 });

            // memory first, then conversation
            let first_conversation = result.messages.iter().position(|m| !is_memory(m));
            let last_memory = result.messages.iter().rposition(is_memory);
            if let (Some(first), Some(last)) = (first_conversation, last_memory) {
                prop_assert!(last < first);
            }
            // a step that waited has already seen its own consolidation
            if wait {
                prop_assert!(last_memory.is_some());
            }
            memory_messages += result.messages.iter().filter(|m| is_memory(m)).count();
        }

        if let Some(leftover) = orchestrator.shutdown() {
            memory_messages += leftover.messages.len();
        }
        prop_assert_eq!(memory_messages, waits.len());
    }

    /// Property: repeated deposits combine exactly like a left fold of merges
    #[test]
    fn prop_pending_slot_never_drops_results(results in prop::collection::vec(result_strategy(), 1..5)) {
        let pending = PendingMemoryResult::new();
        for result in results.clone() {
            pending.deposit(result);
        }

        prop_assert_eq!(pending.take(), Some(StepResult::combine(results)));
        prop_assert!(!pending.is_pending());
    }
}
