//! Shared identifiers used across scenesmith crates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for one of the four pipeline stages.
///
/// Stages run strictly in declaration order. The only backward edge is the
/// single retry from [`StageId::Validating`] to [`StageId::Mapping`], which is
/// owned by the orchestrator rather than encoded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Planning,
    Mapping,
    Synthesizing,
    Validating,
}

impl StageId {
    /// All stages in execution order
    pub const ALL: [StageId; 4] = [
        StageId::Planning,
        StageId::Mapping,
        StageId::Synthesizing,
        StageId::Validating,
    ];

    /// Stable lowercase name used in logs and serialized runs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StageId::Planning => "planning",
            StageId::Mapping => "mapping",
            StageId::Synthesizing => "synthesizing",
            StageId::Validating => "validating",
        }
    }

    /// The stage that follows this one on the forward path
    #[must_use]
    pub const fn next(&self) -> Option<StageId> {
        match self {
            StageId::Planning => Some(StageId::Mapping),
            StageId::Mapping => Some(StageId::Synthesizing),
            StageId::Synthesizing => Some(StageId::Validating),
            StageId::Validating => None,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an effective configuration value came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value provided via environment variable.
    Env,
    /// Value loaded from configuration file.
    Config,
    /// Built-in default value (lowest precedence).
    Default,
}

impl ConfigSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Cli => "cli",
            ConfigSource::Env => "env",
            ConfigSource::Config => "config",
            ConfigSource::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_forward_only() {
        let mut stage = StageId::Planning;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, StageId::ALL.to_vec());
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&StageId::Synthesizing).unwrap();
        assert_eq!(json, "\"synthesizing\"");
        let back: StageId = serde_json::from_str("\"validating\"").unwrap();
        assert_eq!(back, StageId::Validating);
    }

    #[test]
    fn test_config_source_labels() {
        assert_eq!(ConfigSource::Cli.to_string(), "cli");
        assert_eq!(ConfigSource::Default.as_str(), "default");
    }
}
