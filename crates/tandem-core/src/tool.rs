//! Tools an executor may invoke during its own turn.
//!
//! The orchestrator never dispatches tools itself. It only hands tool
//! objects to executors through [`Executor::link_tool`](crate::Executor),
//! which is how the blocking memory-wait capability reaches the conversation
//! executor without the executor knowing anything about threads.

use serde::{Deserialize, Serialize};

/// The outcome of a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub output: String,
    pub success: bool,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// A request an executor made to one of its linked tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub input: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
        }
    }
}

/// A callable capability linked into an executor.
///
/// Tools are shared (`Arc<dyn Tool>`) and may be called from whichever thread
/// runs the owning executor's turn.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self, input: String) -> ExecutionResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn call(&self, input: String) -> ExecutionResult {
            ExecutionResult::success(input)
        }
    }

    #[test]
    fn test_tool_call_dispatch_by_name() {
        let tools: Vec<Box<dyn Tool>> = vec![Box::new(Echo)];
        let call = ToolCall::new("echo", "ping");
        let result = tools
            .iter()
            .find(|t| t.name() == call.name)
            .map(|t| t.call(call.input.clone()))
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, "ping");
        assert!(!ExecutionResult::failure("nope").is_success());
    }
}
