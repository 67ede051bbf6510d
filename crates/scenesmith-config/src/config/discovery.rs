use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use scenesmith_utils::error::ConfigError;

use super::{CliArgs, Config, ConfigSource, OracleConfig, PipelineConfig, RegistryConfig};

/// Environment override for the oracle provider
pub(crate) const PROVIDER_ENV: &str = "SCENESMITH_ORACLE_PROVIDER";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    oracle: Option<OracleConfig>,
    registry: Option<RegistryConfig>,
    pipeline: Option<PipelineConfig>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut source_attribution = HashMap::new();
        let mut oracle = OracleConfig::default();
        let mut registry = RegistryConfig::default();
        let mut pipeline = PipelineConfig::default();

        for key in [
            "oracle_provider",
            "oracle_api_key_env",
            "oracle_max_tokens",
            "oracle_temperature",
            "oracle_timeout_secs",
            "oracle_budget",
            "registry_path",
            "top_k",
            "similarity_floor",
            "max_validation_retries",
            "strict",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            debug!(path = %path.display(), "loaded config file");
            let src = ConfigSource::Config;

            if let Some(file_oracle) = file_config.oracle {
                let mut set = |key: &str| {
                    source_attribution.insert(key.to_string(), src);
                };
                if file_oracle.provider.is_some() {
                    oracle.provider = file_oracle.provider;
                    set("oracle_provider");
                }
                if file_oracle.model.is_some() {
                    oracle.model = file_oracle.model;
                    set("oracle_model");
                }
                if file_oracle.base_url.is_some() {
                    oracle.base_url = file_oracle.base_url;
                    set("oracle_base_url");
                }
                if file_oracle.api_key_env.is_some() {
                    oracle.api_key_env = file_oracle.api_key_env;
                    set("oracle_api_key_env");
                }
                if file_oracle.max_tokens.is_some() {
                    oracle.max_tokens = file_oracle.max_tokens;
                    set("oracle_max_tokens");
                }
                if file_oracle.temperature.is_some() {
                    oracle.temperature = file_oracle.temperature;
                    set("oracle_temperature");
                }
                if file_oracle.timeout_secs.is_some() {
                    oracle.timeout_secs = file_oracle.timeout_secs;
                    set("oracle_timeout_secs");
                }
                if file_oracle.budget.is_some() {
                    oracle.budget = file_oracle.budget;
                    set("oracle_budget");
                }
                if let Some(script) = file_oracle.script_path {
                    // Relative script paths are resolved against the config file's project root.
                    oracle.script_path = Some(resolve_relative(path, script));
                    set("oracle_script_path");
                }
            }

            if let Some(file_registry) = file_config.registry {
                if file_registry.path.is_some() {
                    registry.path = file_registry.path;
                    source_attribution.insert("registry_path".to_string(), src);
                }
                if file_registry.docs_dir.is_some() {
                    registry.docs_dir = file_registry.docs_dir;
                    source_attribution.insert("registry_docs_dir".to_string(), src);
                }
            }

            if let Some(file_pipeline) = file_config.pipeline {
                if file_pipeline.top_k.is_some() {
                    pipeline.top_k = file_pipeline.top_k;
                    source_attribution.insert("top_k".to_string(), src);
                }
                if file_pipeline.similarity_floor.is_some() {
                    pipeline.similarity_floor = file_pipeline.similarity_floor;
                    source_attribution.insert("similarity_floor".to_string(), src);
                }
                if file_pipeline.max_validation_retries.is_some() {
                    pipeline.max_validation_retries = file_pipeline.max_validation_retries;
                    source_attribution.insert("max_validation_retries".to_string(), src);
                }
                if file_pipeline.strict.is_some() {
                    pipeline.strict = file_pipeline.strict;
                    source_attribution.insert("strict".to_string(), src);
                }
            }
        }

        if let Ok(env_provider) = env::var(PROVIDER_ENV)
            && !env_provider.is_empty()
        {
            oracle.provider = Some(env_provider);
            source_attribution.insert("oracle_provider".to_string(), ConfigSource::Env);
        }

        if let Some(provider) = &cli_args.provider {
            oracle.provider = Some(provider.clone());
            source_attribution.insert("oracle_provider".to_string(), ConfigSource::Cli);
        }
        if let Some(model) = &cli_args.model {
            oracle.model = Some(model.clone());
            source_attribution.insert("oracle_model".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli_args.timeout_secs {
            oracle.timeout_secs = Some(timeout);
            source_attribution.insert("oracle_timeout_secs".to_string(), ConfigSource::Cli);
        }
        if let Some(registry_path) = &cli_args.registry_path {
            registry.path = Some(registry_path.clone());
            source_attribution.insert("registry_path".to_string(), ConfigSource::Cli);
        }
        if let Some(strict) = cli_args.strict {
            pipeline.strict = Some(strict);
            source_attribution.insert("strict".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            oracle,
            registry,
            pipeline,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Walk up from `start_dir` looking for `.scenesmith/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".scenesmith").join("config.toml");
            if config_path.exists() {
                debug!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                debug!(root = %current_dir.display(), "no config file below repository root");
                return None;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("{}: {}", path.display(), e.message()))
        })?;
        Ok(config)
    }
}

/// `.scenesmith/config.toml` lives one level below the project root.
fn resolve_relative(config_path: &Path, candidate: PathBuf) -> PathBuf {
    if candidate.is_absolute() {
        return candidate;
    }
    let project_root = config_path
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    project_root.join(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let cfg_dir = dir.join(".scenesmith");
        fs::create_dir_all(&cfg_dir).unwrap();
        let path = cfg_dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_defaults_when_no_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();

        assert_eq!(config.top_k(), 8);
        assert_eq!(config.similarity_floor(), 0.5);
        assert_eq!(config.max_validation_retries(), 1);
        assert_eq!(
            config.source_attribution.get("top_k"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            r#"
[oracle]
provider = "scripted"
model = "file-model"

[pipeline]
top_k = 3
"#,
        );

        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let cli = CliArgs {
            model: Some("cli-model".to_string()),
            ..CliArgs::default()
        };
        let config = Config::discover_from(&nested, &cli).unwrap();

        assert_eq!(config.oracle.provider.as_deref(), Some("scripted"));
        assert_eq!(config.oracle.model.as_deref(), Some("cli-model"));
        assert_eq!(config.top_k(), 3);
        assert_eq!(
            config.source_attribution.get("top_k"),
            Some(&ConfigSource::Config)
        );
        assert_eq!(
            config.source_attribution.get("oracle_model"),
            Some(&ConfigSource::Cli)
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_provider() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[oracle]\nprovider = \"openrouter\"\n");

        unsafe {
            env::set_var(PROVIDER_ENV, "scripted");
        }
        let config = Config::discover_from(temp.path(), &CliArgs::default());
        unsafe {
            env::remove_var(PROVIDER_ENV);
        }

        let config = config.unwrap();
        assert_eq!(config.oracle.provider.as_deref(), Some("scripted"));
        assert_eq!(
            config.source_attribution.get("oracle_provider"),
            Some(&ConfigSource::Env)
        );
    }

    #[test]
    #[serial]
    fn test_unknown_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[pipeline]\ntop_kk = 3\n");

        let err = Config::discover_from(temp.path(), &CliArgs::default()).unwrap_err();
        assert!(format!("{err:#}").contains("top_kk"));
    }

    #[test]
    #[serial]
    fn test_explicit_missing_config_is_error() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("nope.toml")),
            ..CliArgs::default()
        };
        assert!(Config::discover_from(temp.path(), &cli).is_err());
    }

    #[test]
    #[serial]
    fn test_script_path_resolved_against_project_root() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[oracle]\nprovider = \"scripted\"\nscript_path = \"responses.json\"\n",
        );

        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();
        assert_eq!(
            config.oracle.script_path,
            Some(temp.path().join("responses.json"))
        );
    }

    #[test]
    fn test_discovery_stops_at_repo_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[pipeline]\ntop_k = 2\n");
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert!(Config::discover_config_file_from(&repo).is_none());
    }
}
