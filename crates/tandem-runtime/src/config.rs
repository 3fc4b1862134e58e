//! # Orchestrator Configuration
//!
//! Loaded from code (builder), environment variables, or a TOML file.
//!
//! ## Environment Variables
//!
//! - `TANDEM_RENDEZVOUS_TIMEOUT` - How long a conversation turn may block on
//!   memory consolidation, as a humantime duration (`90s`, `2m`) or `none`
//!   to block indefinitely (default: 120s)
//! - `TANDEM_LAUNCH_TIMEOUT` - How long a new step waits for the previous
//!   memory worker before failing (default: 300s, `none` to wait forever)
//! - `TANDEM_PERSIST_AGENT_STATE` - Save executor state after every turn (default: true)
//! - `TANDEM_MEMORY_THREAD_NAME` - Name of the memory worker thread (default: tandem-memory)
//!
//! ## TOML
//!
//! ```toml
//! rendezvous_timeout = "45s"
//! launch_timeout = "none"
//! persist_agent_state = true
//! memory_thread_name = "support-bot-memory"
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Bound on `Rendezvous::park` from the blocking tool. `None` blocks until
    /// the memory worker signals.
    pub rendezvous_timeout: Option<Duration>,
    /// Bound on waiting for the previous memory worker before launching the next.
    pub launch_timeout: Option<Duration>,
    /// Persist each executor's state at the end of its turn.
    pub persist_agent_state: bool,
    pub memory_thread_name: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rendezvous_timeout: Some(Duration::from_secs(120)),
            launch_timeout: Some(Duration::from_secs(300)),
            persist_agent_state: true,
            memory_thread_name: "tandem-memory".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::new()
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        OrchestratorConfigBuilder::from_lookup(|key| std::env::var(key).ok())?.build()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig =
            toml::from_str(contents).map_err(|e| ConfigError::InvalidFile(e.to_string()))?;

        let mut builder = OrchestratorConfigBuilder::new();
        if let Some(raw) = file.rendezvous_timeout {
            builder = builder.rendezvous_timeout(parse_optional_duration(&raw).map_err(
                |message| ConfigError::InvalidFile(format!("rendezvous_timeout: {}", message)),
            )?);
        }
        if let Some(raw) = file.launch_timeout {
            builder = builder.launch_timeout(parse_optional_duration(&raw).map_err(|message| {
                ConfigError::InvalidFile(format!("launch_timeout: {}", message))
            })?);
        }
        if let Some(persist) = file.persist_agent_state {
            builder = builder.persist_agent_state(persist);
        }
        if let Some(name) = file.memory_thread_name {
            builder = builder.memory_thread_name(name);
        }
        builder.build()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rendezvous_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Validation(
                "rendezvous_timeout must be greater than zero".to_string(),
            ));
        }
        if self.launch_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Validation(
                "launch_timeout must be greater than zero".to_string(),
            ));
        }
        if self.memory_thread_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "memory_thread_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    rendezvous_timeout: Option<String>,
    launch_timeout: Option<String>,
    persist_agent_state: Option<bool>,
    memory_thread_name: Option<String>,
}

/// Builder for `OrchestratorConfig`
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `TANDEM_*` variables from an arbitrary lookup, so tests do not
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        if let Some(timeout) = get_env_duration(&lookup, "TANDEM_RENDEZVOUS_TIMEOUT")? {
            builder = builder.rendezvous_timeout(timeout);
        }
        if let Some(timeout) = get_env_duration(&lookup, "TANDEM_LAUNCH_TIMEOUT")? {
            builder = builder.launch_timeout(timeout);
        }
        if let Some(persist) = get_env_bool(&lookup, "TANDEM_PERSIST_AGENT_STATE")? {
            builder = builder.persist_agent_state(persist);
        }
        if let Some(name) = lookup("TANDEM_MEMORY_THREAD_NAME") {
            builder = builder.memory_thread_name(name);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn rendezvous_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.rendezvous_timeout = timeout;
        self
    }

    #[must_use]
    pub fn launch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.launch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn persist_agent_state(mut self, persist: bool) -> Self {
        self.config.persist_agent_state = persist;
        self
    }

    #[must_use]
    pub fn memory_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.memory_thread_name = name.into();
        self
    }

    pub fn build(self) -> Result<OrchestratorConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn parse_optional_duration(raw: &str) -> Result<Option<Duration>, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    humantime::parse_duration(raw)
        .map(Some)
        .map_err(|e| format!("'{}' is not a duration: {}", raw, e))
}

/// `Ok(None)` when unset, `Ok(Some(None))` for an explicit `none`
fn get_env_duration<F>(lookup: &F, key: &str) -> Result<Option<Option<Duration>>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => parse_optional_duration(&raw)
            .map(Some)
            .map_err(|message| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message,
            }),
    }
}

fn get_env_bool<F>(lookup: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            other => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("expected a boolean, got '{}'", other),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.rendezvous_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.launch_timeout, Some(Duration::from_secs(300)));
        assert!(config.persist_agent_state);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let lookup = lookup_from(&[
            ("TANDEM_RENDEZVOUS_TIMEOUT", "250ms"),
            ("TANDEM_LAUNCH_TIMEOUT", "none"),
            ("TANDEM_PERSIST_AGENT_STATE", "false"),
            ("TANDEM_MEMORY_THREAD_NAME", "bot-memory"),
        ]);
        let config = OrchestratorConfigBuilder::from_lookup(lookup)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.rendezvous_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.launch_timeout, None);
        assert!(!config.persist_agent_state);
        assert_eq!(config.memory_thread_name, "bot-memory");
    }

    #[rstest]
    #[case("TANDEM_RENDEZVOUS_TIMEOUT", "soon")]
    #[case("TANDEM_LAUNCH_TIMEOUT", "12 parsecs")]
    #[case("TANDEM_PERSIST_AGENT_STATE", "maybe")]
    fn test_invalid_env_values(#[case] key: &str, #[case] value: &str) {
        let err = OrchestratorConfigBuilder::from_lookup(lookup_from(&[(key, value)])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { key: k, .. } if k == key));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = OrchestratorConfig::builder()
            .rendezvous_timeout(Some(Duration::ZERO))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_toml_config() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            rendezvous_timeout = "45s"
            launch_timeout = "off"
            memory_thread_name = "support-memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.rendezvous_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.launch_timeout, None);
        assert!(config.persist_agent_state);
        assert_eq!(config.memory_thread_name, "support-memory");
    }

    #[test]
    fn test_toml_rejects_unknown_keys_and_bad_durations() {
        assert!(matches!(
            OrchestratorConfig::from_toml_str("retries = 3"),
            Err(ConfigError::InvalidFile(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_toml_str("rendezvous_timeout = \"whenever\""),
            Err(ConfigError::InvalidFile(msg)) if msg.starts_with("rendezvous_timeout")
        ));
        assert!(matches!(
            OrchestratorConfig::from_toml_str("memory_thread_name = \" \""),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tandem.toml");
        std::fs::write(&path, "persist_agent_state = false\n").unwrap();

        let config = OrchestratorConfig::from_file(&path).unwrap();
        assert!(!config.persist_agent_state);
        assert!(OrchestratorConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
