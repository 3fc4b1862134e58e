//! # Step Results
//!
//! A [`StepResult`] is produced once per executor invocation and is never
//! mutated afterwards; results from different threads are combined with
//! [`StepResult::merge`].
//!
//! ## Merge algebra
//!
//! - Boolean flags combine with logical OR
//! - Usage combines by (saturating) addition
//! - Messages concatenate, receiver first
//!
//! The empty result ([`StepResult::default`]) is the identity. Flags and usage
//! are associative and commutative; message order is associative only, so
//! callers fix the order by choosing the receiver. The orchestrator always
//! merges the memory-derived result first and the conversation result second.

use serde::{Deserialize, Serialize};

use crate::message::StepMessage;
use crate::usage::UsageStatistics;

/// The output of one (or several merged) executor invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Messages in emission order
    pub messages: Vec<StepMessage>,
    /// The executor asked to be run again without new user input
    pub heartbeat_requested: bool,
    /// An invocation failed; the failure is carried by value
    pub function_failed: bool,
    /// The executor's context window is close to its limit
    pub memory_warning: bool,
    /// A blocking wait for consolidation timed out and the turn proceeded
    /// without fresh memory
    pub degraded_consolidation: bool,
    pub usage: UsageStatistics,
}

impl StepResult {
    pub fn new(messages: Vec<StepMessage>, usage: UsageStatistics) -> Self {
        Self {
            messages,
            usage,
            ..Self::default()
        }
    }

    /// The by-value record of a failed invocation.
    pub fn failed() -> Self {
        Self {
            function_failed: true,
            ..Self::default()
        }
    }

    pub fn with_heartbeat(mut self) -> Self {
        self.heartbeat_requested = true;
        self
    }

    pub fn with_memory_warning(mut self) -> Self {
        self.memory_warning = true;
        self
    }

    pub fn with_degraded_consolidation(mut self) -> Self {
        self.degraded_consolidation = true;
        self
    }

    /// Combine two results; `self`'s messages come first.
    #[must_use]
    pub fn merge(mut self, later: StepResult) -> StepResult {
        self.messages.extend(later.messages);
        self.heartbeat_requested |= later.heartbeat_requested;
        self.function_failed |= later.function_failed;
        self.memory_warning |= later.memory_warning;
        self.degraded_consolidation |= later.degraded_consolidation;
        self.usage += later.usage;
        self
    }

    /// Fold any number of results left to right.
    pub fn combine<I>(results: I) -> StepResult
    where
        I: IntoIterator<Item = StepResult>,
    {
        results
            .into_iter()
            .fold(StepResult::default(), StepResult::merge)
    }

    pub fn is_empty(&self) -> bool {
        *self == StepResult::default()
    }
}
