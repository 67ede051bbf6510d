use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use scenesmith_utils::types::ConfigSource;

/// Environment variable holding the oracle API key unless overridden
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Where the persisted registry lives unless overridden
pub const DEFAULT_REGISTRY_PATH: &str = ".scenesmith/registry.json";

/// Configuration for scenesmith operations.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > environment > config file > built-in defaults.
///
/// # Configuration File Format
///
/// ```toml
/// [oracle]
/// provider = "openrouter"
/// model = "openai/gpt-4o-mini"
/// timeout_secs = 60
///
/// [registry]
/// path = ".scenesmith/registry.json"
/// docs_dir = "blender_python_reference"
///
/// [pipeline]
/// top_k = 8
/// similarity_floor = 0.5
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Language-model oracle settings.
    pub oracle: OracleConfig,
    /// Registry location and corpus.
    pub registry: RegistryConfig,
    /// Stage tuning.
    pub pipeline: PipelineConfig,
    /// Source attribution for each setting (for `scenesmith config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// Oracle provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    /// `openrouter` (HTTP, OpenAI-compatible) or `scripted` (canned responses)
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Per-call timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Maximum oracle calls per process.
    pub budget: Option<u32>,
    /// Response file for the `scripted` provider, one JSON array of strings.
    pub script_path: Option<PathBuf>,
}

/// Registry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub path: Option<Utf8PathBuf>,
    pub docs_dir: Option<Utf8PathBuf>,
}

/// Pipeline tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Registry candidates included in each mapping prompt.
    pub top_k: Option<usize>,
    /// Minimum similarity for nearest-match substitution, in `[0, 1]`.
    pub similarity_floor: Option<f64>,
    /// Validating -> Mapping retries; only 0 and 1 are accepted.
    pub max_validation_retries: Option<u32>,
    /// Escalate warnings to fatal findings.
    pub strict: Option<bool>,
}

/// CLI overrides fed into discovery
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub registry_path: Option<Utf8PathBuf>,
    pub timeout_secs: Option<u64>,
    pub strict: Option<bool>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: Some("openrouter".to_string()),
            model: None,
            base_url: None,
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            max_tokens: Some(2048),
            temperature: Some(0.2),
            timeout_secs: Some(60),
            budget: Some(40),
            script_path: None,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: Some(Utf8PathBuf::from(DEFAULT_REGISTRY_PATH)),
            docs_dir: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: Some(8),
            similarity_floor: Some(0.5),
            max_validation_retries: Some(1),
            strict: Some(false),
        }
    }
}

impl Config {
    /// Built-in defaults with no file or CLI input; handy for embedding and tests.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            oracle: OracleConfig::default(),
            registry: RegistryConfig::default(),
            pipeline: PipelineConfig::default(),
            source_attribution: HashMap::new(),
        }
    }

    #[must_use]
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle.timeout_secs.unwrap_or(60))
    }

    #[must_use]
    pub fn oracle_budget(&self) -> u32 {
        self.oracle.budget.unwrap_or(40)
    }

    #[must_use]
    pub fn registry_path(&self) -> Utf8PathBuf {
        self.registry
            .path
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_REGISTRY_PATH))
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.pipeline.top_k.unwrap_or(8)
    }

    #[must_use]
    pub fn similarity_floor(&self) -> f64 {
        self.pipeline.similarity_floor.unwrap_or(0.5)
    }

    #[must_use]
    pub fn max_validation_retries(&self) -> u32 {
        self.pipeline.max_validation_retries.unwrap_or(1)
    }

    #[must_use]
    pub fn strict(&self) -> bool {
        self.pipeline.strict.unwrap_or(false)
    }
}
