//! Configuration discovery for the CLI.

use anyhow::{Context, Result};
use montage_orchestrator::OrchestratorConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "MONTAGE_CONFIG";

/// File looked up in the working directory when nothing else is given.
pub const LOCAL_CONFIG: &str = "montage.toml";

/// Picks the configuration file to load.
///
/// Precedence:
/// 1. `--config`
/// 2. `MONTAGE_CONFIG`
/// 3. `./montage.toml` if it exists
fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    local.is_file().then_some(local)
}

/// Loads the orchestrator configuration, falling back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<OrchestratorConfig> {
    match resolve_path(explicit) {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            OrchestratorConfig::load(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => {
            debug!("No configuration file found, using defaults");
            Ok(OrchestratorConfig::default())
        }
    }
}
