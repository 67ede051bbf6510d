mod discovery;
mod model;
mod sources;
mod validation;

pub use model::{
    CliArgs, Config, DEFAULT_API_KEY_ENV, DEFAULT_REGISTRY_PATH, OracleConfig, PipelineConfig,
    RegistryConfig,
};
pub use scenesmith_utils::types::ConfigSource;
