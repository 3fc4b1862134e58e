//! Logging Bootstrap Tests
//!
//! The subscriber is process-global, so everything that touches it lives in
//! one test.

use tandem_testing::{ScriptedExecutor, ScriptedTurn};
use tandem_workspace::observability::ObservabilityError;
use tandem_workspace::{SplitThreadOrchestrator, TracingConfig, TurnInput, init_tracing};

#[test]
fn test_steps_run_under_installed_subscriber() {
    init_tracing(&TracingConfig::pretty().with_default_filter("tandem_runtime=debug"))
        .expect("first initialization succeeds");

    let orchestrator = SplitThreadOrchestrator::builder(
        Box::new(ScriptedExecutor::conversation("chat").with_turn(ScriptedTurn::reply("hi"))),
        Box::new(ScriptedExecutor::memory("mem")),
    )
    .build()
    .unwrap();
    let result = orchestrator.step(TurnInput::user("hello")).unwrap();
    assert!(!result.function_failed);

    assert!(matches!(
        init_tracing(&TracingConfig::default()),
        Err(ObservabilityError::AlreadyInitialized)
    ));
}
