//! The per-prompt run record

use chrono::{DateTime, Utc};
use scenesmith_stage_api::{
    Diagnostic, MappedCall, ScriptPlan, StageId, Subtask, ValidationReport,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `run-<timestamp>-<n>`, unique within the process
pub(crate) fn next_run_id() -> String {
    let n = RUN_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("run-{}-{n}", Utc::now().format("%Y%m%dT%H%M%S%3f"))
}

/// Position of a run in the stage state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Planning,
    Mapping,
    Synthesizing,
    Validating,
    Succeeded,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Mapping => "mapping",
            Self::Synthesizing => "synthesizing",
            Self::Validating => "validating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl From<StageId> for RunState {
    fn from(stage: StageId) -> Self {
        match stage {
            StageId::Planning => Self::Planning,
            StageId::Mapping => Self::Mapping,
            StageId::Synthesizing => Self::Synthesizing,
            StageId::Validating => Self::Validating,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    /// Validation finished with fatal findings
    Rejected,
    Failed,
}

/// Timing of one stage attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageId,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: StageOutcome,
}

/// Why a run ended `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub stage: StageId,
    pub cause: String,
}

/// Everything one prompt produced.
///
/// Owned by the orchestrator until it reaches a terminal state, then handed
/// to the caller. A failed run keeps whatever the earlier stages produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub prompt: String,
    pub state: RunState,
    /// Every state entered, in order
    pub history: Vec<RunState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub subtasks: Vec<Subtask>,
    /// Dependency edges were discarded during planning
    pub degraded: bool,
    pub calls: Vec<MappedCall>,
    pub plan: Option<ScriptPlan>,
    /// One report per validation attempt
    pub reports: Vec<ValidationReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub stages: Vec<StageRecord>,
    pub retried: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
}

impl PipelineRun {
    pub(crate) fn new(id: String, prompt: &str) -> Self {
        Self {
            id,
            prompt: prompt.to_string(),
            state: RunState::Planning,
            history: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            subtasks: Vec::new(),
            degraded: false,
            calls: Vec::new(),
            plan: None,
            reports: Vec::new(),
            diagnostics: Vec::new(),
            stages: Vec::new(),
            retried: false,
            failure: None,
        }
    }

    pub(crate) fn enter(&mut self, state: RunState) {
        self.state = state;
        self.history.push(state);
    }

    pub(crate) fn succeed(mut self) -> Self {
        self.enter(RunState::Succeeded);
        self.finished_at = Some(Utc::now());
        self
    }

    pub(crate) fn fail(mut self, stage: StageId, cause: impl Into<String>) -> Self {
        self.failure = Some(RunFailure {
            stage,
            cause: cause.into(),
        });
        self.enter(RunState::Failed);
        self.finished_at = Some(Utc::now());
        self
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Report of the last validation attempt
    #[must_use]
    pub fn report(&self) -> Option<&ValidationReport> {
        self.reports.last()
    }

    /// Rendered script of the last synthesis
    #[must_use]
    pub fn script(&self) -> Option<&str> {
        self.plan.as_ref().map(|p| p.script.as_str())
    }

    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        let a = next_run_id();
        let b = next_run_id();
        assert!(a.starts_with("run-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_terminal_transitions() {
        let run = PipelineRun::new("run-x-1".to_string(), "a cube");
        assert!(!run.state.is_terminal());
        let failed = run.fail(StageId::Mapping, "cancelled");
        assert_eq!(failed.state, RunState::Failed);
        assert_eq!(failed.history, vec![RunState::Failed]);
        assert_eq!(failed.failure.as_ref().unwrap().stage, StageId::Mapping);
        assert!(failed.finished_at.is_some());
    }

    #[test]
    fn test_serializes_snake_case() {
        let mut run = PipelineRun::new("run-x-2".to_string(), "a cube");
        run.enter(RunState::Planning);
        let run = run.succeed();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["history"][0], "planning");
        assert!(json.get("failure").is_none());
    }
}
