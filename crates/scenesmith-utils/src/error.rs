use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::StageId;

/// Library-level error type with user-friendly reporting.
///
/// `ScenesmithError` is what library entry points return when something goes
/// wrong outside the pipeline's own recovery paths. Recoverable conditions
/// (malformed oracle output, unknown operations, ordering violations,
/// unsatisfiable subtasks) never surface here; they are recorded on the
/// pipeline run as [`FailureKind`]-tagged findings instead.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 3 | Registry load/build errors |
/// | 4 | Pipeline run ended `Failed` |
/// | 10 | Oracle timeout |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum ScenesmithError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Oracle error: {0}")]
    Llm(#[from] LlmError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline run failed in {stage}: {cause}")]
    RunFailed { stage: StageId, cause: String },
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Registry,
    Oracle,
    Pipeline,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Registry => write!(f, "Registry"),
            Self::Oracle => write!(f, "Oracle"),
            Self::Pipeline => write!(f, "Pipeline"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// The recoverable failure taxonomy of a pipeline run.
///
/// Each kind is handled inside the stage that owns it and recorded for audit;
/// none of them aborts a run on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport or timeout error from the oracle (retried once per call site)
    OracleFailure,
    /// Oracle text that survived no repair strategy
    MalformedResponse,
    /// A proposed operation absent from the registry
    UnknownOperation,
    /// A mutation scheduled before its target's creation
    OrderingViolation,
    /// A subtask that mapped to zero calls
    UnsatisfiableSubtask,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OracleFailure => "oracle_failure",
            Self::MalformedResponse => "malformed_response",
            Self::UnknownOperation => "unknown_operation",
            Self::OrderingViolation => "ordering_violation",
            Self::UnsatisfiableSubtask => "unsatisfiable_subtask",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::ValidationFailed { errors } => format!(
                "Configuration validation failed with {} errors: {}",
                errors.len(),
                errors.join(", ")
            ),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [oracle], [registry] and [pipeline] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } => Some(
                "scenesmith searches for .scenesmith/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::ValidationFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .scenesmith/config.toml".to_string(),
                "Remove unknown sections or keys".to_string(),
            ],
            Self::InvalidValue { key, .. } => {
                vec![format!("Correct the value of '{key}' or remove it to use the default")]
            }
            Self::NotFound { path } => vec![format!("Create {path} or drop the --config flag")],
            Self::ValidationFailed { .. } => {
                vec!["Fix the listed values and re-run the command".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Operation registry errors
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("Operation not found: {name}")]
    NotFound { name: String },

    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Registry document at {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Failed to persist registry to {path}: {reason}")]
    PersistFailed { path: String, reason: String },

    #[error("Documentation corpus at {path} contains no pages")]
    EmptyCorpus { path: String },
}

impl UserFriendlyError for RegistryError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { name } => format!("No operation named '{name}' is registered"),
            Self::ReadFailed { path, reason } => format!("Could not read {path}: {reason}"),
            Self::Malformed { path, reason } => {
                format!("The registry file {path} could not be parsed: {reason}")
            }
            Self::PersistFailed { path, reason } => {
                format!("The registry could not be written to {path}: {reason}")
            }
            Self::EmptyCorpus { path } => {
                format!("No documentation pages were found under {path}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => Some(
                "Operation names are fully qualified, for example bpy.ops.mesh.primitive_cube_add."
                    .to_string(),
            ),
            Self::EmptyCorpus { .. } => Some(
                "Only HTML files whose names start with 'bpy.' are treated as documentation pages."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { .. } => {
                vec!["Use 'scenesmith search <words>' to find the right name".to_string()]
            }
            Self::ReadFailed { .. } | Self::Malformed { .. } => vec![
                "Rebuild the registry with 'scenesmith build-registry --docs <dir>'".to_string(),
            ],
            Self::PersistFailed { .. } => {
                vec!["Check that the output directory is writable".to_string()]
            }
            Self::EmptyCorpus { .. } => {
                vec!["Point --docs at the extracted API reference directory".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ReadFailed { .. } | Self::PersistFailed { .. } => ErrorCategory::FileSystem,
            _ => ErrorCategory::Registry,
        }
    }
}

/// Errors that can occur while talking to the language-model oracle
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, response decoding)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Budget limit exceeded
    #[error("Budget exceeded: attempted {attempted} calls, limit is {limit}")]
    BudgetExceeded { limit: u32, attempted: u32 },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl LlmError {
    /// Whether a second attempt at the same call site may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ProviderOutage(_) | Self::Timeout { .. }
        )
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Oracle transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("Oracle provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("Oracle provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("Oracle provider service outage: {msg}"),
            Self::Timeout { duration } => format!("Oracle call timed out after {duration:?}"),
            Self::BudgetExceeded { limit, attempted } => format!(
                "Oracle budget exceeded: attempted {attempted} calls, limit is {limit}"
            ),
            Self::Misconfiguration(msg) => format!("Oracle configuration error: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => {
                Some("Transport errors occur when the oracle endpoint cannot be reached.".to_string())
            }
            Self::Timeout { .. } => Some(
                "A timed-out oracle call is treated like a malformed response and falls back."
                    .to_string(),
            ),
            Self::BudgetExceeded { .. } => Some(
                "The oracle call budget bounds how many completions one process may request."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderAuth(_) => {
                vec!["Export the API key named by [oracle] api_key_env".to_string()]
            }
            Self::ProviderQuota(_) => vec!["Wait and retry, or lower request volume".to_string()],
            Self::Timeout { .. } => vec!["Increase [oracle] timeout_secs".to_string()],
            Self::BudgetExceeded { .. } => vec!["Increase [oracle] budget".to_string()],
            Self::Misconfiguration(_) => {
                vec!["Check the [oracle] section of .scenesmith/config.toml".to_string()]
            }
            Self::Transport(_) | Self::ProviderOutage(_) => {
                vec!["Check network connectivity and the provider status page".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Oracle,
        }
    }
}

/// Unrecoverable stage-internal conditions
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Registry unavailable: {0}")]
    Registry(#[from] RegistryError),

    #[error("Run was cancelled")]
    Cancelled,

    #[error("{stage} stage failed: {reason}")]
    Internal { stage: StageId, reason: String },
}

impl UserFriendlyError for StageError {
    fn user_message(&self) -> String {
        match self {
            Self::EmptyPrompt => "The prompt must contain at least one word".to_string(),
            Self::Registry(err) => err.user_message(),
            Self::Cancelled => "The run was cancelled before completion".to_string(),
            Self::Internal { stage, reason } => format!("The {stage} stage failed: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Registry(err) => err.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::EmptyPrompt => vec!["Describe the scene to build, e.g. 'a red sphere'".to_string()],
            Self::Registry(err) => err.suggestions(),
            Self::Cancelled | Self::Internal { .. } => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Registry(_) => ErrorCategory::Registry,
            _ => ErrorCategory::Pipeline,
        }
    }
}

impl UserFriendlyError for ScenesmithError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Registry(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
            Self::Stage(err) => err.user_message(),
            Self::Io(err) => format!("File system error: {err}"),
            Self::RunFailed { stage, cause } => {
                format!("The pipeline failed during {stage}: {cause}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Registry(err) => err.context(),
            Self::Llm(err) => err.context(),
            Self::Stage(err) => err.context(),
            Self::Io(_) => None,
            Self::RunFailed { .. } => Some(
                "A failed run still carries its subtasks, calls and validation reports.".to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Registry(err) => err.suggestions(),
            Self::Llm(err) => err.suggestions(),
            Self::Stage(err) => err.suggestions(),
            Self::Io(_) => vec!["Check file permissions and free disk space".to_string()],
            Self::RunFailed { .. } => {
                vec!["Re-run with --json to inspect the validation reports".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Registry(err) => err.category(),
            Self::Llm(err) => err.category(),
            Self::Stage(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
            Self::RunFailed { .. } => ErrorCategory::Pipeline,
        }
    }
}

impl ScenesmithError {
    /// Render the error with context and suggestions for terminal output
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("[{}] {}", self.category(), self.user_message());
        if let Some(context) = self.context() {
            out.push_str("\n  ");
            out.push_str(&context);
        }
        for suggestion in self.suggestions() {
            out.push_str("\n  - ");
            out.push_str(&suggestion);
        }
        out
    }
}
