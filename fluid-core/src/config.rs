//! Runtime Configuration
//!
//! A small set of knobs for the per-thread runtime. Defaults match what an
//! application gets without calling [`Runtime::configure`](crate::reactive::Runtime::configure).
//!
//! Configuration can be written by hand or loaded from JSON:
//!
//! ```rust
//! use fluid_core::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json(r#"{ "max_effect_runs": 64 }"#).unwrap();
//! assert_eq!(config.max_effect_runs, 64);
//! assert_eq!(config.listener_prefix, "on");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default bound on effect runs per transaction.
pub const DEFAULT_MAX_EFFECT_RUNS: usize = 100_000;

/// Tunables for the reactive runtime and the property reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many queued effects a single transaction may run before it
    /// abandons the rest of its queue.
    pub max_effect_runs: usize,

    /// Attribute-name prefix that marks an event listener (`onclick`,
    /// `onInput`, ...).
    pub listener_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_effect_runs: DEFAULT_MAX_EFFECT_RUNS,
            listener_prefix: "on".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON document. Missing fields take
    /// their default value.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_effect_runs == 0 {
            return Err(ConfigError::Invalid {
                field: "max_effect_runs",
                reason: "must be at least 1",
            });
        }
        if self.listener_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "listener_prefix",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// If `attribute` names an event listener, return the event type it
    /// listens for (lower-cased, prefix stripped).
    pub fn listener_event(&self, attribute: &str) -> Option<String> {
        attribute
            .strip_prefix(self.listener_prefix.as_str())
            .filter(|event| !event.is_empty())
            .map(str::to_lowercase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn rejects_zero_effect_runs() {
        let err = RuntimeConfig::from_json(r#"{ "max_effect_runs": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_effect_runs", .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RuntimeConfig::from_json("{ max_effect_runs").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn listener_event_strips_prefix() {
        let config = RuntimeConfig::default();
        assert_eq!(config.listener_event("onClick").as_deref(), Some("click"));
        assert_eq!(config.listener_event("oninput").as_deref(), Some("input"));
        assert_eq!(config.listener_event("on"), None);
        assert_eq!(config.listener_event("class"), None);
    }
}
