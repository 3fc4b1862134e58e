//! Validated identifier types.
//!
//! Agent identifiers end up in file names (see the file persister) and in
//! log fields, so they are parsed once at the boundary and carried as
//! newtypes afterwards.
//!
//! # Validation Rules
//!
//! - Non-empty, at most 128 characters
//! - No leading or trailing whitespace
//! - Only alphanumeric characters, hyphens (`-`), underscores (`_`), and dots (`.`)
//! - No `..` sequences

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum length for identifiers
pub const MAX_ID_LENGTH: usize = 128;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    #[error("Identifier cannot be empty")]
    Empty,

    #[error("Identifier cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace,

    #[error(
        "Identifier can only contain alphanumeric characters, hyphens, underscores, and dots: '{0}'"
    )]
    InvalidCharacters(String),

    #[error("Identifier too long ({length} chars, max {max})")]
    TooLong { length: usize, max: usize },

    #[error("Identifier cannot contain path traversal sequences")]
    PathTraversal,
}

fn validate(id: &str) -> Result<&str, IdValidationError> {
    if id.is_empty() {
        return Err(IdValidationError::Empty);
    }
    if id.trim() != id {
        return Err(IdValidationError::LeadingTrailingWhitespace);
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(IdValidationError::TooLong {
            length: id.len(),
            max: MAX_ID_LENGTH,
        });
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(IdValidationError::InvalidCharacters(id.to_string()));
    }
    if id.contains("..") {
        return Err(IdValidationError::PathTraversal);
    }
    Ok(id)
}

/// Unique identifier for an executor's persisted agent state
///
/// # Examples
///
/// ```rust
/// use tandem_core::AgentId;
///
/// let id = AgentId::parse("support-bot_memory").unwrap();
/// assert_eq!(id.as_str(), "support-bot_memory");
///
/// assert!(AgentId::parse("").is_err());
/// assert!(AgentId::parse("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Parse and validate an agent ID
    pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        validate(id.as_ref()).map(|s| Self(s.to_string()))
    }

    /// Generate a fresh random agent ID (`agent-<uuid>`)
    pub fn generate() -> Self {
        Self(format!("agent-{}", Uuid::new_v4()))
    }

    /// Get the agent ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl TryFrom<String> for AgentId {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

/// Correlation id for one orchestrator step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(Uuid);

impl StepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
