//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Initializes logging
//! - Builds CliArgs and discovers Config
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;

use super::args::{Cli, Commands, LogFormatArg};
use super::commands;

use crate::error::{ConfigError, LlmError, RegistryError, ScenesmithError, StageError};
use crate::logging::{LogFormat, init_tracing};
use crate::{CliArgs, Config, ExitCode};

/// Main CLI execution function.
///
/// Prints every error itself and returns the exit code; main.rs only exits.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    if let Err(e) = init_tracing(cli.verbose, format) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        provider: cli.provider.clone(),
        model: cli.model.clone(),
        registry_path: cli.registry.as_deref().map(Into::into),
        timeout_secs: cli.oracle_timeout,
        strict: cli.strict.then_some(true),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report(&err)),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::BuildRegistry { docs, out, json } => {
                commands::execute_build_registry_command(docs.as_deref(), out.as_deref(), json, &config)
            }
            Commands::Stats { json } => commands::execute_stats_command(json, &config),
            Commands::Search {
                query,
                category,
                limit,
                json,
            } => commands::execute_search_command(&query, category.as_deref(), limit, json, &config),
            Commands::Show { operation, json } => {
                commands::execute_show_command(&operation, json, &config)
            }
            Commands::Run { prompt, out, json } => {
                commands::execute_run_command(&prompt, out.as_deref(), json, &config).await
            }
            Commands::Config { json } => commands::execute_config_command(json, &config),
        }
    });

    result.map_err(|err| report(&err))
}

/// Print `err` for the user and pick its exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    match classify(err) {
        Some(known) => {
            eprintln!("✗ {}", known.display_for_user());
            known.to_exit_code()
        }
        None => {
            eprintln!("✗ {err:#}");
            ExitCode::INTERNAL
        }
    }
}

/// First typed error in the chain, lifted into `ScenesmithError`
fn classify(err: &anyhow::Error) -> Option<ScenesmithError> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ScenesmithError>() {
            match e {
                ScenesmithError::RunFailed { stage, cause } => Some(ScenesmithError::RunFailed {
                    stage: *stage,
                    cause: cause.clone(),
                }),
                ScenesmithError::Config(e) => Some(e.clone().into()),
                ScenesmithError::Registry(e) => Some(e.clone().into()),
                ScenesmithError::Llm(e) => Some(e.clone().into()),
                ScenesmithError::Stage(e) => Some(e.clone().into()),
                ScenesmithError::Io(_) => None,
            }
        } else if let Some(e) = cause.downcast_ref::<ConfigError>() {
            Some(e.clone().into())
        } else if let Some(e) = cause.downcast_ref::<RegistryError>() {
            Some(e.clone().into())
        } else if let Some(e) = cause.downcast_ref::<LlmError>() {
            Some(e.clone().into())
        } else {
            cause
                .downcast_ref::<StageError>()
                .map(|e| ScenesmithError::from(e.clone()))
        }
    })
}
