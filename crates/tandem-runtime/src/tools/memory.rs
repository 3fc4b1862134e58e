use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};

use tandem_core::{ExecutionResult, SharedMemoryState, Tool};

/// The memory an executor owns, shared with the tools linked into it.
pub type MemoryHandle = Arc<Mutex<SharedMemoryState>>;

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, input: &str) -> Result<T, ExecutionResult> {
    serde_json::from_str(input).map_err(|e| {
        ExecutionResult::failure(format!("{}: invalid arguments: {}", tool, e))
    })
}

fn with_memory<F>(memory: &MemoryHandle, f: F) -> ExecutionResult
where
    F: FnOnce(&mut SharedMemoryState) -> ExecutionResult,
{
    let mut state = memory.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut state)
}

#[derive(Debug, Deserialize)]
struct AppendArgs {
    label: String,
    content: String,
}

/// `{"label": "human", "content": "Likes tea"}`
pub struct CoreMemoryAppend {
    memory: MemoryHandle,
}

impl CoreMemoryAppend {
    pub fn new(memory: MemoryHandle) -> Self {
        Self { memory }
    }
}

impl Tool for CoreMemoryAppend {
    fn name(&self) -> &str {
        "core_memory_append"
    }

    fn call(&self, input: String) -> ExecutionResult {
        let args: AppendArgs = match parse_args(self.name(), &input) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        with_memory(&self.memory, |state| match state.append(&args.label, &args.content) {
            Ok(()) => ExecutionResult::success(format!("Appended to '{}'", args.label)),
            Err(e) => ExecutionResult::failure(e.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReplaceArgs {
    label: String,
    old_content: String,
    new_content: String,
}

/// `{"label": "human", "old_content": "Sam", "new_content": "Alex"}`
pub struct CoreMemoryReplace {
    memory: MemoryHandle,
}

impl CoreMemoryReplace {
    pub fn new(memory: MemoryHandle) -> Self {
        Self { memory }
    }
}

impl Tool for CoreMemoryReplace {
    fn name(&self) -> &str {
        "core_memory_replace"
    }

    fn call(&self, input: String) -> ExecutionResult {
        let args: ReplaceArgs = match parse_args(self.name(), &input) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        with_memory(&self.memory, |state| {
            match state.replace(&args.label, &args.old_content, &args.new_content) {
                Ok(()) => ExecutionResult::success(format!("Replaced text in '{}'", args.label)),
                Err(e) => ExecutionResult::failure(e.to_string()),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ArchivalArgs {
    content: String,
}

/// `{"content": "Met Sam on Tuesday"}`
pub struct ArchivalMemoryInsert {
    memory: MemoryHandle,
}

impl ArchivalMemoryInsert {
    pub fn new(memory: MemoryHandle) -> Self {
        Self { memory }
    }
}

impl Tool for ArchivalMemoryInsert {
    fn name(&self) -> &str {
        "archival_memory_insert"
    }

    fn call(&self, input: String) -> ExecutionResult {
        let args: ArchivalArgs = match parse_args(self.name(), &input) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        with_memory(&self.memory, |state| {
            state.insert_archival(args.content);
            ExecutionResult::success("Inserted into archival memory")
        })
    }
}
