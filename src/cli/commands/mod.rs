//! CLI command implementations (facade).
//!
//! This module re-exports the command surface used by `run.rs`.
//! Implementations live in `commands/*`.

mod common;
mod config_cmd;
mod json_emit;
mod pipeline;
mod registry;

pub use config_cmd::execute_config_command;
pub use pipeline::execute_run_command;
pub use registry::{
    execute_build_registry_command, execute_search_command, execute_show_command,
    execute_stats_command,
};
