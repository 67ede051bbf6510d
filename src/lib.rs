//! scenesmith - natural-language scene descriptions to validated Blender scripts
//!
//! A prompt is decomposed into subtasks, each subtask is mapped onto
//! operations from a registry built from the Blender Python API reference,
//! the mapped calls are synthesized into one self-contained script, and the
//! script is validated before anything executes it. A script that fails
//! validation is mapped once more with the findings as feedback.
//!
//! scenesmith can be used in two ways:
//! - **CLI**: `scenesmith build-registry`, `scenesmith run "<prompt>"`, ...
//! - **Library**: build an [`Orchestrator`] and call [`Orchestrator::run`]
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Build the registry from a local copy of the API reference
//! scenesmith build-registry --docs ./blender_python_reference
//!
//! # Generate a script
//! scenesmith run "Create a red sphere" --out sphere.py
//!
//! # Full run record as canonical JSON
//! scenesmith run "a table with a lamp on it" --json
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use scenesmith::{CliArgs, Config, Orchestrator, RegistryHandle, persist};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let registry = RegistryHandle::new(persist::load(&config.registry_path())?);
//! let run = Orchestrator::from_config(&config, registry)?.run("Create a red sphere");
//!
//! println!("{} after {} stage(s)", run.state, run.stages.len());
//! # Ok(())
//! # }
//! ```
//!
//! # JSON Contracts
//!
//! Registry snapshots, build reports and run records are emitted in JCS
//! (RFC 8785) canonical form. Use [`emit_jcs`] for your own integrations.

// ============================================================================
// Public API
// ============================================================================

/// Pipeline stage identifiers: planning → mapping → synthesizing → validating.
pub use scenesmith_utils::types::StageId;

/// Configuration with discovery and precedence:
/// CLI flags > environment > config file > built-in defaults.
pub use scenesmith_config::{CliArgs, Config};

/// Library-level error type.
///
/// Use [`display_for_user()`](ScenesmithError::display_for_user) for messages
/// and [`to_exit_code()`](ScenesmithError::to_exit_code) for the CLI mapping.
pub use scenesmith_utils::error::ScenesmithError;

/// Exit codes matching the documented exit code table.
pub use scenesmith_utils::exit_codes::ExitCode;

pub use scenesmith_utils::error::{ErrorCategory, FailureKind, UserFriendlyError};

/// JCS (RFC 8785) canonical JSON emission
pub use scenesmith_utils::canonicalization::emit_jcs;

pub use scenesmith_utils::atomic_write::write_file_atomic;

pub use scenesmith_registry::{
    BuildReport, OperationClass, OperationSpec, ParamSpec, ParamType, Registry, RegistryBuilder,
    RegistryHandle, RegistryStats, SearchHit, persist,
};

pub use scenesmith_stage_api::{
    Finding, MappedCall, Provenance, ScriptPlan, Severity, Subtask, SubtaskStatus,
    ValidationReport,
};

pub use scenesmith_orchestrator::{
    CancelHandle, Orchestrator, PipelineRun, RunFailure, RunState, StageOutcome, StageRecord,
    Stages,
};

// ============================================================================
// Internal modules - accessible but not stable
// ============================================================================

#[doc(hidden)]
pub use scenesmith_utils::{error, logging};

#[doc(hidden)]
pub use scenesmith_validation as validation;

#[doc(hidden)]
pub use scenesmith_registry::fixtures;

// CLI module - exported for white-box testing of flag parsing
#[doc(hidden)]
pub mod cli;
