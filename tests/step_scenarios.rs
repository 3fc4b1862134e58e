//! Step Orchestration Scenarios
//!
//! End-to-end runs of `SplitThreadOrchestrator::step` with scripted executors,
//! covering the ordering, retry, failure, and timeout behaviour of a step.

use rstest::rstest;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tandem_core::{Executor, InputError, SharedMemoryState, StepResult, TurnInput};
use tandem_runtime::{
    CoreMemoryAppend, OrchestratorConfig, OrchestratorError, SplitThreadOrchestrator,
    WAIT_FOR_MEMORY_TOOL,
};
use tandem_testing::{EventKind, Gate, ScriptedExecutor, ScriptedTurn, Timeline};

fn test_config() -> OrchestratorConfig {
    OrchestratorConfig::builder()
        .rendezvous_timeout(Some(Duration::from_secs(5)))
        .launch_timeout(Some(Duration::from_secs(5)))
        .build()
        .expect("valid config")
}

fn build(
    conversation: ScriptedExecutor,
    memory: ScriptedExecutor,
    config: OrchestratorConfig,
) -> SplitThreadOrchestrator {
    SplitThreadOrchestrator::builder(Box::new(conversation), Box::new(memory))
        .config(config)
        .build()
        .expect("orchestrator builds")
}

fn contents(result: &StepResult) -> Vec<&str> {
    result.messages.iter().map(|m| m.content.as_str()).collect()
}

fn wait_turn() -> ScriptedTurn {
    ScriptedTurn::empty().call(WAIT_FOR_MEMORY_TOOL, "{}")
}

/// Memory that finishes after the conversation turn is returned on the next step
#[test]
fn test_late_memory_result_surfaces_on_next_step() {
    let first_gate = Gate::new();
    let second_gate = Gate::new();
    let memory = ScriptedExecutor::memory("mem").with_turns([
        ScriptedTurn::reply("consolidated 1").hold_until(&first_gate),
        ScriptedTurn::reply("consolidated 2").hold_until(&second_gate),
    ]);
    let conversation = ScriptedExecutor::conversation("chat")
        .with_turns([ScriptedTurn::reply("reply 1"), ScriptedTurn::reply("reply 2")]);
    let orchestrator = build(conversation, memory, test_config());

    let first = orchestrator.step(TurnInput::user("hello")).unwrap();
    assert_eq!(contents(&first), vec!["reply 1"]);
    assert!(!orchestrator.has_pending_memory());

    first_gate.open();
    let second = orchestrator.step(TurnInput::user("again")).unwrap();
    assert_eq!(contents(&second), vec!["consolidated 1", "reply 2"]);

    second_gate.open();
    let leftover = orchestrator.shutdown().expect("unclaimed memory result");
    assert_eq!(contents(&leftover), vec!["consolidated 2"]);
}

#[test]
fn test_blocking_tool_parks_then_retries_once() {
    let memory = ScriptedExecutor::memory("mem").with_turn(
        ScriptedTurn::reply("consolidated")
            .delay(Duration::from_millis(50))
            .usage(10, 5),
    );
    let conversation = ScriptedExecutor::conversation("chat").with_turns([
        wait_turn().usage(3, 1),
        ScriptedTurn::reply("answer with fresh memory").usage(7, 2),
    ]);
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, test_config());

    let result = orchestrator.step(TurnInput::user("what's my name?")).unwrap();

    assert_eq!(probe.invocations(), 2);
    let messages = contents(&result);
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], "consolidated");
    assert_eq!(messages[2], "answer with fresh memory");
    assert_eq!(result.usage.total_tokens, 28);
    assert!(!result.function_failed);
    assert!(!result.degraded_consolidation);
    assert!(!orchestrator.has_pending_memory());
}

#[rstest]
#[case::error(ScriptedTurn::fail("model unavailable"))]
#[case::panic(ScriptedTurn::panic("memory executor exploded"))]
fn test_memory_failure_is_delivered_without_hanging(#[case] memory_turn: ScriptedTurn) {
    let memory = ScriptedExecutor::memory("mem").with_turn(memory_turn.delay(Duration::from_millis(20)));
    let conversation = ScriptedExecutor::conversation("chat")
        .with_turns([wait_turn(), ScriptedTurn::reply("carrying on")]);
    let orchestrator = build(conversation, memory, test_config());

    let started = Instant::now();
    let result = orchestrator.step(TurnInput::user("hello")).unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(result.function_failed);
    assert!(!result.degraded_consolidation);
    assert_eq!(contents(&result).last(), Some(&"carrying on"));
}

#[test]
fn test_parked_turn_resumes_without_timeout_when_memory_panics() {
    let config = OrchestratorConfig::builder()
        .rendezvous_timeout(None)
        .launch_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap();
    let memory = ScriptedExecutor::memory("mem")
        .with_turn(ScriptedTurn::panic("boom").delay(Duration::from_millis(30)));
    let conversation = ScriptedExecutor::conversation("chat")
        .with_turns([wait_turn(), ScriptedTurn::reply("done")]);
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, config);

    let result = orchestrator.step(TurnInput::user("hello")).unwrap();

    assert!(result.function_failed);
    assert_eq!(probe.invocations(), 2);
}

#[test]
fn test_conversation_turns_are_serialized_across_concurrent_steps() {
    let timeline = Timeline::new();
    let first_turn_started = Gate::new();
    let release_first_turn = Gate::new();
    let second_memory_started = Gate::new();

    let memory = ScriptedExecutor::memory("mem")
        .with_timeline(&timeline)
        .with_turns([
            ScriptedTurn::reply("consolidated 1"),
            ScriptedTurn::reply("consolidated 2").signal_start(&second_memory_started),
        ]);
    let conversation = ScriptedExecutor::conversation("chat")
        .with_timeline(&timeline)
        .with_turns([
            ScriptedTurn::reply("reply 1")
                .signal_start(&first_turn_started)
                .hold_until(&release_first_turn),
            ScriptedTurn::reply("reply 2"),
        ]);
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, test_config());

    thread::scope(|scope| {
        let first = scope.spawn(|| orchestrator.step(TurnInput::user("one")));
        assert!(first_turn_started.wait(Duration::from_secs(5)));

        let second = scope.spawn(|| orchestrator.step(TurnInput::user("two")));

        // Step two launches its memory worker while step one still holds the
        // conversation turn, but its own conversation turn has to wait.
        assert!(second_memory_started.wait(Duration::from_secs(5)));
        assert_eq!(probe.invocations(), 1);

        release_first_turn.open();
        first.join().unwrap().unwrap();
        second.join().unwrap().unwrap();
    });

    let first_done = timeline
        .position("chat", 1, &EventKind::TurnFinished)
        .unwrap();
    let second_start = timeline
        .position("chat", 2, &EventKind::TurnStarted)
        .unwrap();
    assert!(first_done < second_start);
    assert_eq!(probe.invocations(), 2);
}

/// A turn that parks after the next step has launched still waits on its own memory worker
#[test]
fn test_parked_turn_is_bound_to_its_own_step_worker() {
    let config = OrchestratorConfig::builder()
        .rendezvous_timeout(Some(Duration::from_secs(2)))
        .launch_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap();
    let second_memory_started = Gate::new();
    let release_second_memory = Gate::new();

    let memory = ScriptedExecutor::memory("mem").with_turns([
        ScriptedTurn::reply("consolidated 1"),
        ScriptedTurn::reply("consolidated 2")
            .signal_start(&second_memory_started)
            .hold_until(&release_second_memory),
    ]);
    let conversation = ScriptedExecutor::conversation("chat").with_turns([
        // Parks only once step two's memory worker is running.
        wait_turn().hold_until(&second_memory_started),
        ScriptedTurn::reply("reply 1"),
        // Leaves step one time to claim its memory result.
        ScriptedTurn::reply("reply 2").delay(Duration::from_millis(100)),
    ]);
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, config);

    let first = thread::scope(|scope| {
        let first = scope.spawn(|| orchestrator.step(TurnInput::user("one")));
        let second = scope.spawn(|| {
            // Step one's memory worker has to finish before step two launches.
            let deadline = Instant::now() + Duration::from_secs(5);
            while !orchestrator.has_pending_memory() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            orchestrator.step(TurnInput::user("two"))
        });

        let first = first.join().unwrap().unwrap();
        release_second_memory.open();
        second.join().unwrap().unwrap();
        first
    });

    assert!(!first.degraded_consolidation);
    assert_eq!(contents(&first).first(), Some(&"consolidated 1"));
    assert_eq!(contents(&first).last(), Some(&"reply 1"));
    assert_eq!(probe.invocations(), 3);
}

#[test]
fn test_rendezvous_timeout_degrades_instead_of_hanging() {
    let config = OrchestratorConfig::builder()
        .rendezvous_timeout(Some(Duration::from_millis(50)))
        .launch_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap();
    let gate = Gate::new();
    let memory = ScriptedExecutor::memory("mem")
        .with_turn(ScriptedTurn::reply("consolidated").hold_until(&gate));
    let conversation = ScriptedExecutor::conversation("chat")
        .with_turn(wait_turn().heartbeat());
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, config);

    let result = orchestrator.step(TurnInput::user("hello")).unwrap();

    assert!(result.degraded_consolidation);
    assert!(result.heartbeat_requested);
    assert_eq!(probe.invocations(), 1);
    assert!(!contents(&result).contains(&"consolidated"));

    gate.open();
    let leftover = orchestrator.shutdown().expect("memory result kept");
    assert_eq!(contents(&leftover), vec!["consolidated"]);
}

#[test]
fn test_step_refuses_launch_while_previous_consolidation_runs() {
    let config = OrchestratorConfig::builder()
        .launch_timeout(Some(Duration::from_millis(200)))
        .build()
        .unwrap();
    let gate = Gate::new();
    let memory = ScriptedExecutor::memory("mem")
        .with_turn(ScriptedTurn::reply("slow consolidation").hold_until(&gate));
    let conversation = ScriptedExecutor::conversation("chat");
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, config);

    orchestrator.step(TurnInput::user("one")).unwrap();
    let err = orchestrator.step(TurnInput::user("two")).unwrap_err();
    assert!(matches!(err, OrchestratorError::ConsolidationInFlight { .. }));
    assert_eq!(probe.invocations(), 1);

    gate.open();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !orchestrator.has_pending_memory() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    let third = orchestrator.step(TurnInput::user("three")).unwrap();
    assert_eq!(contents(&third).first(), Some(&"slow consolidation"));
}

#[test]
fn test_invalid_input_fails_before_any_worker_runs() {
    let memory = ScriptedExecutor::memory("mem");
    let conversation = ScriptedExecutor::conversation("chat");
    let (memory_probe, conversation_probe) = (memory.probe(), conversation.probe());
    let orchestrator = build(conversation, memory, test_config());

    let err = orchestrator.step(TurnInput::new(Vec::new())).unwrap_err();

    assert!(matches!(err, OrchestratorError::InvalidInput(InputError::Empty)));
    assert_eq!(memory_probe.invocations(), 0);
    assert_eq!(conversation_probe.invocations(), 0);
}

#[test]
fn test_retry_that_waits_again_is_not_repeated() {
    let memory = ScriptedExecutor::memory("mem");
    let conversation = ScriptedExecutor::conversation("chat").with_turns([
        wait_turn(),
        wait_turn(),
        ScriptedTurn::reply("plain"),
    ]);
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, test_config());

    orchestrator.step(TurnInput::user("one")).unwrap();
    assert_eq!(probe.invocations(), 2);

    orchestrator.step(TurnInput::user("two")).unwrap();
    assert_eq!(probe.invocations(), 3);
}

#[test]
fn test_consolidated_memory_is_synced_before_retry() {
    let initial = SharedMemoryState::new().with_block("human", "");
    let timeline = Timeline::new();

    let mut memory = ScriptedExecutor::memory("mem")
        .with_memory(initial.clone())
        .with_timeline(&timeline)
        .with_turn(ScriptedTurn::reply("saved").call(
            "core_memory_append",
            r#"{"label": "human", "content": "Name: Ada"}"#,
        ));
    let memory_handle = memory.memory_handle();
    memory.link_tool(Arc::new(CoreMemoryAppend::new(memory.memory_handle())));

    let conversation = ScriptedExecutor::conversation("chat")
        .with_memory(initial)
        .with_timeline(&timeline)
        .with_turns([wait_turn(), ScriptedTurn::reply("Hi Ada")]);
    let probe = conversation.probe();
    let orchestrator = build(conversation, memory, test_config());

    orchestrator.step(TurnInput::user("I'm Ada")).unwrap();

    let mirrored = orchestrator.shared_memory();
    assert_eq!(mirrored.value("human"), Some("Name: Ada"));
    assert_eq!(&mirrored, &*memory_handle.lock().unwrap());
    assert_eq!(probe.last_synced(), Some(mirrored.clone()));
    assert_eq!(orchestrator.update_state().memory, mirrored);

    let synced = timeline
        .position("chat", 1, &EventKind::Synced { version: 1 })
        .unwrap();
    let retry_started = timeline
        .position("chat", 2, &EventKind::TurnStarted)
        .unwrap();
    assert!(synced < retry_started);
}
