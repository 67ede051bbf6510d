//! Oracle abstraction for multi-provider support
//!
//! Stages talk to a language model through the [`Oracle`] trait only. Providers
//! implement [`OracleBackend`]; [`BackendOracle`] adapts a backend into an
//! oracle with a per-call timeout and a single retry.

mod budgeted_backend;
pub(crate) mod http_client;
mod openrouter_backend;
mod oracle;
mod scripted;
mod types;

use std::sync::Arc;

use scenesmith_config::Config;
use tracing::info;

pub use budgeted_backend::BudgetedBackend;
pub use oracle::BackendOracle;
pub use scenesmith_utils::error::LlmError;
pub use scripted::{ScriptedBackend, ScriptedReply};
pub use types::{Message, Oracle, OracleBackend, OracleReply, OracleRequest, Role};

pub(crate) use openrouter_backend::OpenRouterBackend;

/// Supported values of `[oracle] provider`
pub const PROVIDERS: &[&str] = &["openrouter", "scripted"];

fn construct_backend(provider: &str, config: &Config) -> Result<Arc<dyn OracleBackend>, LlmError> {
    match provider {
        "openrouter" => {
            let backend = OpenRouterBackend::new_from_config(config)?;
            let budgeted =
                BudgetedBackend::with_limit_from_config(Box::new(backend), config.oracle_budget());
            Ok(Arc::new(budgeted))
        }
        "scripted" => {
            let path = config.oracle.script_path.as_deref().ok_or_else(|| {
                LlmError::Misconfiguration(
                    "The scripted provider requires [oracle] script_path".to_string(),
                )
            })?;
            let backend = ScriptedBackend::from_file(path)?;
            let budgeted =
                BudgetedBackend::with_limit_from_config(Box::new(backend), config.oracle_budget());
            Ok(Arc::new(budgeted))
        }
        unknown => Err(LlmError::Misconfiguration(format!(
            "Unknown oracle provider '{unknown}'. Supported providers: {}.",
            PROVIDERS.join(", ")
        ))),
    }
}

/// Create the oracle the pipeline stages use.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` for an unknown provider or invalid
/// provider-specific settings (missing API key, missing script file).
pub fn from_config(config: &Config) -> Result<Arc<dyn Oracle>, LlmError> {
    let provider = config.oracle.provider.as_deref().unwrap_or("openrouter");
    let backend = construct_backend(provider, config)?;

    info!(
        provider = provider,
        timeout_secs = config.oracle_timeout().as_secs(),
        "Oracle backend ready"
    );

    Ok(Arc::new(BackendOracle::new(
        backend,
        config.oracle.model.clone().unwrap_or_default(),
        config.oracle_timeout(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = Config::defaults();
        config.oracle.provider = Some("carrier-pigeon".to_string());
        match from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains("carrier-pigeon"));
                assert!(msg.contains("openrouter, scripted"));
            }
            _ => panic!("Expected Misconfiguration for unknown provider"),
        }
    }

    #[test]
    fn test_scripted_requires_script_path() {
        let mut config = Config::defaults();
        config.oracle.provider = Some("scripted".to_string());
        assert!(matches!(
            from_config(&config),
            Err(LlmError::Misconfiguration(msg)) if msg.contains("script_path")
        ));
    }

    #[tokio::test]
    async fn test_scripted_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replies.json");
        std::fs::write(&path, r#"["{\"subtasks\": []}"]"#).unwrap();

        let mut config = Config::defaults();
        config.oracle.provider = Some("scripted".to_string());
        config.oracle.script_path = Some(path);

        let oracle = from_config(&config).unwrap();
        assert_eq!(
            oracle.complete("anything", None).await.unwrap(),
            "{\"subtasks\": []}"
        );
    }
}
