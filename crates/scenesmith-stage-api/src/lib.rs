//! Stage contracts for the scenesmith pipeline
//!
//! This crate holds the run data model and one trait per pipeline stage. The
//! orchestrator depends on the traits only, so each stage can be exercised in
//! isolation with a stubbed oracle or hand-built inputs.
//!
//! # Purpose
//!
//! Every stage is a function from (input state, registry snapshot) to
//! (output state, diagnostics). Recoverable failures are returned as
//! [`Diagnostic`]s or [`Finding`]s; only unrecoverable conditions come back
//! as [`StageError`].

mod model;
mod report;
mod scope;

use async_trait::async_trait;
use scenesmith_registry::Registry;

pub use model::{
    ColorSpec, Diagnostic, MappedCall, MappingOutcome, PlanOutcome, Provenance, Subtask,
    SubtaskStatus,
};
pub use report::{Finding, ScriptPlan, ScriptStep, Severity, ValidationReport};
pub use scenesmith_utils::error::{FailureKind, StageError};
pub use scenesmith_utils::types::StageId;
pub use scope::TargetScope;

/// Decomposes a prompt into subtasks
#[async_trait]
pub trait Planner: Send + Sync {
    /// Produce subtasks in a dependency-respecting order.
    ///
    /// # Errors
    ///
    /// Returns `StageError::EmptyPrompt` for a blank prompt.
    async fn plan(&self, prompt: &str, context: Option<&str>) -> Result<PlanOutcome, StageError>;
}

/// Resolves one subtask into registry operations
#[async_trait]
pub trait Mapper: Send + Sync {
    /// Map `subtask` against `registry`.
    ///
    /// `scope` carries the targets created by earlier subtasks of the same
    /// pass. `feedback` holds findings from a failed validation that the
    /// proposal should address.
    async fn map(
        &self,
        subtask: &Subtask,
        registry: &Registry,
        scope: &mut TargetScope,
        feedback: Option<&str>,
    ) -> Result<MappingOutcome, StageError>;
}

/// Linearizes mapped calls into a script
pub trait Synthesizer: Send + Sync {
    /// `subtasks` are in execution order; `calls` may include dropped calls,
    /// which are never emitted.
    ///
    /// # Errors
    ///
    /// Returns `StageError::Internal` if a kept call names an operation absent
    /// from `registry`.
    fn synthesize(
        &self,
        subtasks: &[Subtask],
        calls: &[MappedCall],
        registry: &Registry,
    ) -> Result<ScriptPlan, StageError>;
}

/// Statically inspects a plan
pub trait Validator: Send + Sync {
    /// Every check runs; the report is complete even when an early check fails.
    fn validate(
        &self,
        plan: &ScriptPlan,
        subtasks: &[Subtask],
        calls: &[MappedCall],
        registry: &Registry,
    ) -> ValidationReport;
}
