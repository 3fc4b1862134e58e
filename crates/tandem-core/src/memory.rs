//! # Shared Memory State
//!
//! The core memory both workers read: a handful of labelled text blocks
//! (persona, human, ...) plus an append-only list of archival passages.
//!
//! Only the memory worker's executor mutates this durably. The conversation
//! worker holds a mirror that is replaced wholesale after every consolidation,
//! never merged, and uses [`SharedMemoryState::version`] to tell whether its
//! mirror is newer than what its executor last saw.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::MemoryError;

/// Default character limit for a core memory block
pub const DEFAULT_BLOCK_LIMIT: usize = 2000;

/// One labelled block of core memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub value: String,
    pub limit: usize,
}

impl MemoryBlock {
    pub fn new(value: impl Into<String>, limit: usize) -> Self {
        Self {
            value: value.into(),
            limit,
        }
    }
}

/// Core and archival memory shared between the two workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemoryState {
    blocks: BTreeMap<String, MemoryBlock>,
    #[serde(default)]
    archival: Vec<String>,
    #[serde(default)]
    version: u64,
}

impl SharedMemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block with the default limit. Builder-style, does not bump the version.
    pub fn with_block(self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_limited_block(label, value, DEFAULT_BLOCK_LIMIT)
    }

    pub fn with_limited_block(
        mut self,
        label: impl Into<String>,
        value: impl Into<String>,
        limit: usize,
    ) -> Self {
        self.blocks
            .insert(label.into(), MemoryBlock::new(value, limit));
        self
    }

    pub fn block(&self, label: &str) -> Option<&MemoryBlock> {
        self.blocks.get(label)
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.blocks.get(label).map(|b| b.value.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn archival(&self) -> &[String] {
        &self.archival
    }

    /// Monotonic mutation counter
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Append text to a block, separated by a newline when the block is non-empty.
    pub fn append(&mut self, label: &str, text: &str) -> Result<(), MemoryError> {
        let block = self.block_mut(label)?;
        let new_value = if block.value.is_empty() {
            text.to_string()
        } else {
            format!("{}\n{}", block.value, text)
        };
        Self::check_limit(label, &new_value, block.limit)?;
        block.value = new_value;
        self.version += 1;
        Ok(())
    }

    /// Replace the first occurrence of `old` within a block.
    pub fn replace(&mut self, label: &str, old: &str, new: &str) -> Result<(), MemoryError> {
        let block = self.block_mut(label)?;
        if old.is_empty() || !block.value.contains(old) {
            return Err(MemoryError::TextNotFound {
                label: label.to_string(),
            });
        }
        let new_value = block.value.replacen(old, new, 1);
        Self::check_limit(label, &new_value, block.limit)?;
        block.value = new_value;
        self.version += 1;
        Ok(())
    }

    pub fn insert_archival(&mut self, passage: impl Into<String>) {
        self.archival.push(passage.into());
        self.version += 1;
    }

    fn block_mut(&mut self, label: &str) -> Result<&mut MemoryBlock, MemoryError> {
        self.blocks
            .get_mut(label)
            .ok_or_else(|| MemoryError::UnknownBlock {
                label: label.to_string(),
            })
    }

    fn check_limit(label: &str, value: &str, limit: usize) -> Result<(), MemoryError> {
        let length = value.chars().count();
        if length > limit {
            return Err(MemoryError::LimitExceeded {
                label: label.to_string(),
                length,
                limit,
            });
        }
        Ok(())
    }
}
