use crate::error::{PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Decision cache tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Use the per-generation cache (false = every request walks the policy)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Shards per table
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Max resources in the resource → ACE list index
    #[serde(default = "default_list_capacity")]
    pub list_capacity: usize,

    /// Max memoized term results
    #[serde(default = "default_term_capacity")]
    pub term_capacity: usize,

    /// Max cached decisions
    #[serde(default = "default_decision_capacity")]
    pub decision_capacity: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_shards() -> usize {
    16
}

fn default_list_capacity() -> usize {
    4_096
}

fn default_term_capacity() -> usize {
    65_536
}

fn default_decision_capacity() -> usize {
    65_536
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            shards: default_shards(),
            list_capacity: default_list_capacity(),
            term_capacity: default_term_capacity(),
            decision_capacity: default_decision_capacity(),
        }
    }
}

/// Built-in evaluator selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Register the built-in evaluators
    #[serde(default = "default_enabled")]
    pub builtins: bool,

    /// Built-ins to leave out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            builtins: default_enabled(),
            disabled: Vec::new(),
        }
    }
}

/// Top-level access-control configuration, loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AclConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub evaluators: EvaluatorConfig,

    /// JSON policy loaded at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<PathBuf>,
}

impl AclConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AclConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PolicyError::Config(format!("TOML serialize error: {}", e)))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let cache = &self.cache;
        if cache.shards == 0 {
            return Err(PolicyError::Config("cache.shards must be > 0".into()));
        }
        for (name, value) in [
            ("list_capacity", cache.list_capacity),
            ("term_capacity", cache.term_capacity),
            ("decision_capacity", cache.decision_capacity),
        ] {
            if value == 0 {
                return Err(PolicyError::Config(format!("cache.{} must be > 0", name)));
            }
        }
        if let Some(name) = self.evaluators.disabled.iter().find(|n| n.trim().is_empty()) {
            return Err(PolicyError::Config(format!(
                "evaluators.disabled contains an empty name: {:?}",
                name
            )));
        }
        Ok(())
    }
}
