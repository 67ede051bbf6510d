//! Stage sequencing, the bounded validation retry, and cancellation

use chrono::Utc;
use scenesmith_config::Config;
use scenesmith_llm::{LlmError, Oracle};
use scenesmith_registry::{Registry, RegistryHandle};
use scenesmith_stage_api::{
    Diagnostic, MappedCall, Mapper, Planner, StageError, StageId, Subtask, SubtaskStatus,
    Synthesizer, TargetScope, Validator,
};
use scenesmith_stages::{OracleMapper, OraclePlanner, PythonSynthesizer};
use scenesmith_utils::logging::{
    log_stage_complete, log_stage_error, log_stage_start, redact_secrets, stage_span,
};
use scenesmith_validation::QualityValidator;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{Instrument, info, warn};

use crate::run::{PipelineRun, RunState, StageOutcome, StageRecord, next_run_id};

/// Stops runs at the next stage boundary.
///
/// A stage already in progress finishes; no further stage starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The four stage implementations a pipeline runs
#[derive(Clone)]
pub struct Stages {
    pub planner: Arc<dyn Planner>,
    pub mapper: Arc<dyn Mapper>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub validator: Arc<dyn Validator>,
}

impl Stages {
    /// Oracle-backed planner and mapper with the default synthesizer and
    /// validator.
    #[must_use]
    pub fn with_oracle(oracle: Arc<dyn Oracle>, config: &Config) -> Self {
        Self {
            planner: Arc::new(OraclePlanner::new(oracle.clone())),
            mapper: Arc::new(OracleMapper::new(
                oracle,
                config.top_k(),
                config.similarity_floor(),
            )),
            synthesizer: Arc::new(PythonSynthesizer::new()),
            validator: Arc::new(QualityValidator::new(config.strict())),
        }
    }
}

/// Drives prompts through `Planning → Mapping → Synthesizing → Validating`.
///
/// Runs share nothing mutable: each takes a registry snapshot when it starts
/// and owns its run record until it returns.
pub struct Orchestrator {
    registry: RegistryHandle,
    stages: Stages,
    max_validation_retries: u32,
    cancel: CancelHandle,
}

impl Orchestrator {
    #[must_use]
    pub fn new(registry: RegistryHandle, stages: Stages) -> Self {
        Self {
            registry,
            stages,
            max_validation_retries: 1,
            cancel: CancelHandle::new(),
        }
    }

    /// Build the oracle from `config` and wire the default stages.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` when the oracle provider cannot be
    /// constructed.
    pub fn from_config(config: &Config, registry: RegistryHandle) -> Result<Self, LlmError> {
        let oracle = scenesmith_llm::from_config(config)?;
        Ok(Self::new(registry, Stages::with_oracle(oracle, config))
            .with_max_validation_retries(config.max_validation_retries()))
    }

    /// Retries are capped at one regardless of the requested value.
    #[must_use]
    pub fn with_max_validation_retries(mut self, retries: u32) -> Self {
        self.max_validation_retries = retries.min(1);
        self
    }

    /// Handle that cancels every run of this orchestrator
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    #[must_use]
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Run `prompt` to a terminal state on a private runtime.
    ///
    /// Blocks the calling thread; inside an async context use
    /// [`Orchestrator::run_async`].
    #[must_use]
    pub fn run(&self, prompt: &str) -> PipelineRun {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run_async(prompt)),
            Err(e) => PipelineRun::new(next_run_id(), prompt)
                .fail(StageId::Planning, format!("could not start async runtime: {e}")),
        }
    }

    pub async fn run_async(&self, prompt: &str) -> PipelineRun {
        self.run_with_cancel(prompt, &self.cancel).await
    }

    /// Run `prompt`, observing `cancel` between stages.
    pub async fn run_with_cancel(&self, prompt: &str, cancel: &CancelHandle) -> PipelineRun {
        let registry = self.registry.snapshot();
        let mut run = PipelineRun::new(next_run_id(), prompt);
        info!(run_id = %run.id, registry_version = %registry.version(), "Pipeline run started");

        if cancel.is_cancelled() {
            return cancelled(run, StageId::Planning);
        }

        run.enter(RunState::Planning);
        let (result, record) = timed(&run.id, StageId::Planning, self.stages.planner.plan(prompt, None)).await;
        run.stages.push(record);
        match result {
            Ok(outcome) => {
                run.subtasks = outcome.subtasks;
                run.diagnostics.extend(outcome.diagnostics);
                run.degraded = outcome.degraded;
            }
            Err(e) => return failed(run, StageId::Planning, &e),
        }
        if cancel.is_cancelled() {
            return cancelled(run, StageId::Planning);
        }

        let mut feedback: Option<String> = None;
        let mut retries_left = self.max_validation_retries;
        loop {
            run.enter(RunState::Mapping);
            let mut subtasks = std::mem::take(&mut run.subtasks);
            let (result, record) = timed(
                &run.id,
                StageId::Mapping,
                self.map_all(&mut subtasks, &registry, feedback.as_deref()),
            )
            .await;
            run.subtasks = subtasks;
            run.stages.push(record);
            match result {
                Ok((calls, diagnostics)) => {
                    run.calls = calls;
                    run.diagnostics.extend(diagnostics);
                }
                Err(e) => return failed(run, StageId::Mapping, &e),
            }
            if cancel.is_cancelled() {
                return cancelled(run, StageId::Mapping);
            }

            run.enter(RunState::Synthesizing);
            let synthesizer = &self.stages.synthesizer;
            let (result, record) = timed(&run.id, StageId::Synthesizing, async {
                synthesizer.synthesize(&run.subtasks, &run.calls, &registry)
            })
            .await;
            run.stages.push(record);
            let plan = match result {
                Ok(plan) => plan,
                Err(e) => return failed(run, StageId::Synthesizing, &e),
            };
            if cancel.is_cancelled() {
                run.plan = Some(plan);
                return cancelled(run, StageId::Synthesizing);
            }

            run.enter(RunState::Validating);
            let validator = &self.stages.validator;
            let (result, mut record) = timed(&run.id, StageId::Validating, async {
                Ok::<_, StageError>(validator.validate(&plan, &run.subtasks, &run.calls, &registry))
            })
            .await;
            run.plan = Some(plan);
            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    run.stages.push(record);
                    return failed(run, StageId::Validating, &e);
                }
            };
            let passed = report.passed;
            let fatal: Vec<String> = report.fatal().map(ToString::to_string).collect();
            let feedback_text = retry_feedback(&fatal, &report.remediation_notes());
            if !passed {
                record.outcome = StageOutcome::Rejected;
            }
            run.stages.push(record);
            run.reports.push(report);

            if passed {
                info!(run_id = %run.id, calls = run.calls.len(), "Pipeline run succeeded");
                return run.succeed();
            }

            if retries_left == 0 {
                let cause = format!(
                    "validation failed with {} fatal finding(s): {}",
                    fatal.len(),
                    fatal.join("; ")
                );
                warn!(run_id = %run.id, fatal = fatal.len(), "Pipeline run failed validation");
                return run.fail(StageId::Validating, cause);
            }
            if cancel.is_cancelled() {
                return cancelled(run, StageId::Validating);
            }

            retries_left -= 1;
            run.retried = true;
            warn!(
                run_id = %run.id,
                fatal = fatal.len(),
                "Validation found fatal problems, mapping again"
            );
            feedback = Some(feedback_text);
        }
    }

    /// Map every subtask in order with a fresh target scope.
    async fn map_all(
        &self,
        subtasks: &mut [Subtask],
        registry: &Registry,
        feedback: Option<&str>,
    ) -> Result<(Vec<MappedCall>, Vec<Diagnostic>), StageError> {
        let mut scope = TargetScope::new();
        let mut calls = Vec::new();
        let mut diagnostics = Vec::new();
        for subtask in subtasks.iter_mut() {
            subtask.status = SubtaskStatus::Pending;
            let outcome = self
                .stages
                .mapper
                .map(subtask, registry, &mut scope, feedback)
                .await?;
            subtask.status = outcome.status;
            calls.extend(outcome.calls);
            diagnostics.extend(outcome.diagnostics);
        }
        Ok((calls, diagnostics))
    }
}

/// Fatal findings followed by their remediation notes, one per line
fn retry_feedback(fatal: &[String], notes: &[&str]) -> String {
    let mut text = fatal.join("\n");
    if !notes.is_empty() {
        text.push_str("\nSuggested fixes:");
        for note in notes {
            text.push_str("\n- ");
            text.push_str(note);
        }
    }
    text
}

/// Await one stage inside its span and time it.
async fn timed<T, F>(run_id: &str, stage: StageId, fut: F) -> (Result<T, StageError>, StageRecord)
where
    F: Future<Output = Result<T, StageError>>,
{
    log_stage_start(run_id, stage);
    let started_at = Utc::now();
    let clock = Instant::now();
    let result = fut.instrument(stage_span(run_id, stage)).await;
    let elapsed = clock.elapsed().as_millis();

    let outcome = match &result {
        Ok(_) => {
            log_stage_complete(run_id, stage, elapsed);
            StageOutcome::Completed
        }
        Err(e) => {
            log_stage_error(run_id, stage, &e.to_string(), elapsed);
            StageOutcome::Failed
        }
    };
    let record = StageRecord {
        stage,
        started_at,
        duration_ms: u64::try_from(elapsed).unwrap_or(u64::MAX),
        outcome,
    };
    (result, record)
}

fn failed(run: PipelineRun, stage: StageId, error: &StageError) -> PipelineRun {
    match error {
        StageError::Cancelled => cancelled(run, stage),
        other => run.fail(stage, redact_secrets(&other.to_string())),
    }
}

fn cancelled(run: PipelineRun, stage: StageId) -> PipelineRun {
    info!(run_id = %run.id, stage = %stage, "Pipeline run cancelled");
    run.fail(stage, "cancelled")
}
