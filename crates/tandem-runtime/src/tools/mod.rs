//! Tools the runtime links into executors.
//!
//! - [`WaitForMemoryTool`]: the blocking capability given to the conversation
//!   executor
//! - [`CoreMemoryAppend`], [`CoreMemoryReplace`], [`ArchivalMemoryInsert`]:
//!   the memory-mutation tools that define the memory executor's toolset

mod memory;
mod wait;

pub use memory::{ArchivalMemoryInsert, CoreMemoryAppend, CoreMemoryReplace, MemoryHandle};
pub use wait::WaitForMemoryTool;

/// Name of the blocking tool linked into every conversation executor
pub const WAIT_FOR_MEMORY_TOOL: &str = "wait_for_memory_update";

/// Tool names that belong to the memory executor when a toolset is split
pub const MEMORY_TOOLS: [&str; 3] = [
    "core_memory_append",
    "core_memory_replace",
    "archival_memory_insert",
];

pub fn is_memory_tool(name: &str) -> bool {
    MEMORY_TOOLS.contains(&name)
}
