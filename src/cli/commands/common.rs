//! Helpers shared by the command handlers

use anyhow::{Context, Result};
use camino::Utf8PathBuf;

use crate::{Config, Registry, persist};

/// Load the persisted registry the configuration points at.
pub fn load_registry(config: &Config) -> Result<Registry> {
    let path = config.registry_path();
    persist::load(&path).with_context(|| format!("Failed to load registry from {path}"))
}

/// `--out` when given, the configured registry path otherwise
pub fn registry_out_path(out: Option<&str>, config: &Config) -> Utf8PathBuf {
    out.map_or_else(|| config.registry_path(), Utf8PathBuf::from)
}

/// Hint printed after a command that changed state
pub fn next_steps_hint(registry_path: &str) -> String {
    format!(
        "Next: scenesmith --registry {registry_path} search \"<keywords>\" or scenesmith run \"<prompt>\""
    )
}
