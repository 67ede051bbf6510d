//! Run data model shared by the stages

use scenesmith_registry::OperationClass;
use scenesmith_utils::error::FailureKind;
use scenesmith_utils::types::StageId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Completion status of a subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Pending,
    Satisfied,
    /// Some proposed calls were dropped, at least one survived
    PartiallySatisfied,
    /// Zero calls after every fallback
    Unsatisfied,
}

impl SubtaskStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Satisfied => "satisfied",
            Self::PartiallySatisfied => "partially_satisfied",
            Self::Unsatisfied => "unsatisfied",
        }
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decomposed unit of user intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub goal: String,
    /// Prerequisite subtask ids, all present in the same run
    pub depends_on: Vec<String>,
    pub status: SubtaskStatus,
}

impl Subtask {
    #[must_use]
    pub fn new(id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: goal.into(),
            depends_on: Vec::new(),
            status: SubtaskStatus::Pending,
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }
}

/// How a proposed call fared against the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Accepted,
    /// The proposed name was replaced by a registered operation
    Substituted { from: String },
    /// No registered operation was close enough
    Dropped { proposed: String, reason: String },
}

/// RGBA quadruple, each channel in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSpec {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ColorSpec {
    #[must_use]
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// One resolved operation invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedCall {
    pub subtask_id: String,
    /// Registered operation name, or the proposed name when dropped
    pub operation: String,
    pub params: BTreeMap<String, Value>,
    pub provenance: Provenance,
    pub class: OperationClass,
    /// Object this call creates (creation) or modifies (mutation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorSpec>,
    /// Position in the subtask's proposal
    pub order: usize,
}

impl MappedCall {
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        matches!(self.provenance, Provenance::Dropped { .. })
    }
}

/// A recorded, non-fatal event from one of the taxonomy kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: FailureKind,
    pub stage: StageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: FailureKind, stage: StageId, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            subtask_id: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_subtask(mut self, subtask_id: impl Into<String>) -> Self {
        self.subtask_id = Some(subtask_id.into());
        self
    }
}

/// Planner output: subtasks in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub subtasks: Vec<Subtask>,
    pub diagnostics: Vec<Diagnostic>,
    /// Dependency edges were discarded in favour of input order
    pub degraded: bool,
}

/// Mapper output for one subtask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingOutcome {
    /// Every proposed call, dropped ones included
    pub calls: Vec<MappedCall>,
    pub diagnostics: Vec<Diagnostic>,
    pub status: SubtaskStatus,
}

impl MappingOutcome {
    /// Calls that survived registry validation
    pub fn kept(&self) -> impl Iterator<Item = &MappedCall> {
        self.calls.iter().filter(|c| !c.is_dropped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_serialization() {
        let substituted = Provenance::Substituted {
            from: "add_cube".to_string(),
        };
        let json = serde_json::to_value(&substituted).unwrap();
        assert_eq!(json["kind"], "substituted");
        assert_eq!(json["from"], "add_cube");

        let accepted: Provenance = serde_json::from_str(r#"{"kind":"accepted"}"#).unwrap();
        assert_eq!(accepted, Provenance::Accepted);
    }

    #[test]
    fn test_dropped_calls_are_not_kept() {
        let call = |provenance| MappedCall {
            subtask_id: "task_001".to_string(),
            operation: "bpy.ops.mesh.primitive_cube_add".to_string(),
            params: BTreeMap::new(),
            provenance,
            class: OperationClass::Creation,
            target: Some("Cube".to_string()),
            color: None,
            order: 0,
        };
        let outcome = MappingOutcome {
            calls: vec![
                call(Provenance::Accepted),
                call(Provenance::Dropped {
                    proposed: "summon_dragon".to_string(),
                    reason: "no close match".to_string(),
                }),
            ],
            diagnostics: Vec::new(),
            status: SubtaskStatus::PartiallySatisfied,
        };
        assert_eq!(outcome.kept().count(), 1);
    }

    #[test]
    fn test_color_display() {
        assert_eq!(ColorSpec::rgba(1.0, 0.0, 0.0, 1.0).to_string(), "(1, 0, 0, 1)");
        assert_eq!(SubtaskStatus::PartiallySatisfied.to_string(), "partially_satisfied");
    }
}
