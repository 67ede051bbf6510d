//! Command-line interface for scenesmith
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions and parsing structures (clap)
//! - `run`: Main entry point and command dispatch
//! - `commands`: Command implementations and helpers

pub mod args;
mod commands;
mod run;

// Re-export argument types
pub use args::{Cli, Commands};

// Re-export run function
pub use run::run;
