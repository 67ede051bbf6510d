//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and the subcommand enum.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// scenesmith - prompt to Blender script, validated against an operation registry
#[derive(Parser, Debug)]
#[command(name = "scenesmith")]
#[command(about = "Turn scene descriptions into validated Blender Python scripts")]
#[command(long_about = r#"
scenesmith plans a natural-language scene description into subtasks, maps each
subtask onto operations from a registry built from the Blender API docs,
synthesizes one self-contained script, and validates it before it ever reaches
Blender.

EXAMPLES:
  # Build the operation registry from a local copy of the API docs
  scenesmith build-registry --docs ./blender_python_reference

  # Inspect the registry
  scenesmith stats
  scenesmith search "uv sphere" --limit 5
  scenesmith show bpy.ops.mesh.primitive_uv_sphere_add

  # Turn a prompt into a script
  scenesmith run "Create a red sphere" --out sphere.py

  # Full run record as JSON
  scenesmith run "a table with a lamp on it" --json

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > environment > config file > defaults
  Config file is discovered by searching upward from CWD for .scenesmith/config.toml
  Use --config to specify an explicit config file path

STAGES:
  planning → mapping → synthesizing → validating
  A run whose script fails validation is mapped again once with the findings as feedback
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Compact)]
    pub log_format: LogFormatArg,

    /// Oracle provider (openrouter, scripted)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model passed to the oracle provider
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Path of the persisted operation registry
    #[arg(long, global = true)]
    pub registry: Option<String>,

    /// Per-call oracle timeout in seconds
    #[arg(long, global = true)]
    pub oracle_timeout: Option<u64>,

    /// Treat validation warnings as fatal
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Compact,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a documentation corpus into an operation registry
    BuildRegistry {
        /// Directory of `bpy.*.html` pages (defaults to [registry] docs_dir)
        #[arg(long)]
        docs: Option<String>,

        /// Where to write the registry (defaults to the configured registry path)
        #[arg(long)]
        out: Option<String>,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print statistics of the persisted registry
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Ranked keyword search over operation names and descriptions
    Search {
        query: String,

        /// Restrict results to one category tag
        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Print one operation signature
    Show {
        operation: String,

        #[arg(long)]
        json: bool,
    },

    /// Run the pipeline on a prompt
    Run {
        prompt: String,

        /// Write the script here when the run succeeds
        #[arg(long)]
        out: Option<String>,

        /// Print the full run record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and where each value came from
    Config {
        #[arg(long)]
        json: bool,
    },
}
