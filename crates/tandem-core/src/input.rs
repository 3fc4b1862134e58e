//! Input handed to both executors for one step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::message::StepMessage;

/// The user-facing input of one logical step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInput {
    pub messages: Vec<StepMessage>,
    /// This is the first message of the conversation
    #[serde(default)]
    pub first_message: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TurnInput {
    /// Maximum content size of a single message (1MB)
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    pub fn new(messages: Vec<StepMessage>) -> Self {
        Self {
            messages,
            first_message: false,
            timestamp: None,
        }
    }

    /// A single user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(vec![StepMessage::user(content)])
    }

    pub fn first(mut self) -> Self {
        self.first_message = true;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Check the preconditions a step enforces before any worker runs.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.messages.is_empty() {
            return Err(InputError::Empty);
        }
        for (index, message) in self.messages.iter().enumerate() {
            if message.content.trim().is_empty() {
                return Err(InputError::BlankMessage { index });
            }
            if message.content.len() > Self::MAX_MESSAGE_SIZE {
                return Err(InputError::TooLarge {
                    index,
                    size: message.content.len(),
                    max_size: Self::MAX_MESSAGE_SIZE,
                });
            }
        }
        Ok(())
    }
}
