//! TOML configuration for the orchestrator.

use crate::retry::RetryPolicy;
use crate::routing::RoutingStrategy;
use montage_abstraction::EngineKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the file.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Per-engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Disabled engines are never constructed.
    pub enabled: bool,
    /// Opaque blob handed to the engine constructor.
    pub params: serde_json::Value,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { enabled: true, params: serde_json::Value::Null }
    }
}

/// Orchestrator configuration.
///
/// ```toml
/// concurrency_limit = 2
/// routing_strategy = "free_first"
/// priority = ["vheer", "cogvideox_flash"]
///
/// [retry]
/// max_retries = 1
///
/// [engines.runway_ml]
/// enabled = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum orchestration calls in flight across all engines.
    pub concurrency_limit: usize,

    /// Strategy used when the caller names no engine.
    pub routing_strategy: RoutingStrategy,

    /// Engine order for priority-based decisions and tie-breaks.
    pub priority: Vec<EngineKind>,

    /// Retry budget and backoff.
    pub retry: RetryPolicy,

    /// Default artifact directory.
    pub output_dir: PathBuf,

    /// Per-engine settings, keyed by engine name.
    pub engines: BTreeMap<EngineKind, EngineSettings>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            routing_strategy: RoutingStrategy::default(),
            priority: EngineKind::ALL.to_vec(),
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from("output/videos"),
            engines: BTreeMap::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::Validation("concurrency_limit must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for kind in &self.priority {
            if !seen.insert(*kind) {
                return Err(ConfigError::Validation(format!(
                    "engine '{}' appears more than once in priority",
                    kind
                )));
            }
        }

        self.retry.validate()
    }

    /// Whether `kind` may be constructed.
    pub fn is_enabled(&self, kind: EngineKind) -> bool {
        self.engines.get(&kind).is_none_or(|settings| settings.enabled)
    }

    /// Constructor parameters for `kind`.
    pub fn engine_params(&self, kind: EngineKind) -> serde_json::Value {
        self.engines.get(&kind).map(|s| s.params.clone()).unwrap_or_default()
    }
}
