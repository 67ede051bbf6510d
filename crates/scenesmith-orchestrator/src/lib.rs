//! Pipeline orchestration for scenesmith
//!
//! One [`PipelineRun`] per prompt, moved through
//! `Planning → Mapping → Synthesizing → Validating → {Succeeded, Failed}`.
//! The only backward edge is a single retry from `Validating` to `Mapping`
//! when validation finds fatal problems; the fatal findings are handed to the
//! mapper as feedback. A second rejection ends the run `Failed` with both
//! reports attached.
//!
//! # Example
//!
//! ```rust,no_run
//! use scenesmith_config::{CliArgs, Config};
//! use scenesmith_orchestrator::Orchestrator;
//! use scenesmith_registry::{RegistryHandle, persist};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let registry = RegistryHandle::new(persist::load(&config.registry_path())?);
//! let orchestrator = Orchestrator::from_config(&config, registry)?;
//!
//! let run = orchestrator.run("Create a red sphere");
//! if let Some(script) = run.script().filter(|_| run.succeeded()) {
//!     println!("{script}");
//! }
//! # Ok(())
//! # }
//! ```

mod orchestrator;
mod run;

pub use orchestrator::{CancelHandle, Orchestrator, Stages};
pub use run::{PipelineRun, RunFailure, RunState, StageOutcome, StageRecord};
