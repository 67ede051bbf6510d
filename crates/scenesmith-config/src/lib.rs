//! Configuration management for scenesmith
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. Configuration files are TOML with
//! `[oracle]`, `[registry]` and `[pipeline]` sections.

mod config;

pub use config::{
    CliArgs, Config, DEFAULT_API_KEY_ENV, DEFAULT_REGISTRY_PATH, OracleConfig, PipelineConfig,
    RegistryConfig,
};
pub use scenesmith_utils::types::ConfigSource;
