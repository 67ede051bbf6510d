//! Script plans and validation reports

use scenesmith_utils::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::MappedCall;

/// One step of a linearized plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Existence check protecting the next call; `None` checks the active object
    Guard { target: Option<String> },
    Call(MappedCall),
}

impl ScriptStep {
    #[must_use]
    pub fn as_call(&self) -> Option<&MappedCall> {
        match self {
            Self::Call(call) => Some(call),
            Self::Guard { .. } => None,
        }
    }
}

/// Ordered, guard-annotated calls and their rendered script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPlan {
    pub steps: Vec<ScriptStep>,
    /// Rendered, self-contained script handed to the executor
    pub script: String,
    /// BLAKE3 of `script`
    pub fingerprint: String,
}

impl ScriptPlan {
    pub fn calls(&self) -> impl Iterator<Item = &MappedCall> {
        self.steps.iter().filter_map(ScriptStep::as_call)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Surfaced to the caller, execution proceeds
    Warning,
    /// Blocks execution
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Fatal => "fatal",
        })
    }
}

/// One validator observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    /// Name of the check that produced it
    pub check: String,
    /// `step N`, `line N`, or `subtask <id>`
    pub location: String,
    pub message: String,
    /// What would make the finding go away
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remediation: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.severity, self.check, self.location, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    /// A report passes when no finding is fatal.
    #[must_use]
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let passed = !findings.iter().any(|f| f.severity == Severity::Fatal);
        Self { passed, findings }
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Fatal)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    #[must_use]
    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.findings.iter().any(|f| f.kind == Some(kind))
    }

    /// Remediation notes, fatal findings first, each note once
    #[must_use]
    pub fn remediation_notes(&self) -> Vec<&str> {
        let mut notes: Vec<&str> = Vec::new();
        for finding in self.fatal().chain(self.warnings()) {
            let note = finding.remediation.as_str();
            if !note.is_empty() && !notes.contains(&note) {
                notes.push(note);
            }
        }
        notes
    }
}
