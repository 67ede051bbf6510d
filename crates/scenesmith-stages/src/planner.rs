//! Planner: prompt to ordered subtasks
//!
//! The oracle proposes a decomposition; a response that fails structural
//! parsing earns one retry with a clarified instruction, then the whole prompt
//! becomes a single catch-all subtask. Dependency edges always come back as a
//! DAG: unknown prerequisites are dropped, and a cycle collapses the plan to
//! input order.

use async_trait::async_trait;
use scenesmith_llm::Oracle;
use scenesmith_repair::RepairChain;
use scenesmith_stage_api::{
    Diagnostic, FailureKind, PlanOutcome, Planner, StageError, StageId, Subtask,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::prompts::{PLAN_CLARIFICATION, PLAN_INSTRUCTIONS};

const LIST_KEYS: &[&str] = &["subtasks", "tasks", "steps"];
const GOAL_KEYS: &[&str] = &["goal", "description", "title", "task"];
const ID_KEYS: &[&str] = &["id", "task_id"];
const DEPENDENCY_KEYS: &[&str] = &["depends_on", "dependencies", "prerequisites"];

/// A subtask as proposed, before ids and edges are checked
#[derive(Debug, Clone, PartialEq, Eq)]
struct Draft {
    id: Option<String>,
    goal: String,
    depends_on: Vec<String>,
}

/// Planner backed by the language-model oracle
pub struct OraclePlanner {
    oracle: Arc<dyn Oracle>,
    repair: RepairChain,
}

impl OraclePlanner {
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            repair: RepairChain::standard(),
        }
    }

    /// One oracle round; `None` when the reply is unusable.
    async fn attempt(
        &self,
        prompt: &str,
        context: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Vec<Draft>> {
        let text = match self.oracle.complete(prompt, context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Oracle failed during planning");
                diagnostics.push(Diagnostic::new(
                    FailureKind::OracleFailure,
                    StageId::Planning,
                    e.to_string(),
                ));
                return None;
            }
        };

        let drafts = match self.repair.repair(&text) {
            Ok(repaired) => parse_drafts(&repaired.value),
            Err(failure) => {
                debug!(attempts = failure.attempts.len(), "Planning response survived no repair strategy");
                Vec::new()
            }
        };
        if drafts.is_empty() {
            diagnostics.push(Diagnostic::new(
                FailureKind::MalformedResponse,
                StageId::Planning,
                "response held no subtasks",
            ));
            return None;
        }
        Some(drafts)
    }
}

#[async_trait]
impl Planner for OraclePlanner {
    async fn plan(&self, prompt: &str, context: Option<&str>) -> Result<PlanOutcome, StageError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StageError::EmptyPrompt);
        }

        let mut diagnostics = Vec::new();
        let request = format!("{PLAN_INSTRUCTIONS}\n\nRequest: {prompt}");

        let drafts = match self.attempt(&request, context, &mut diagnostics).await {
            Some(drafts) => drafts,
            None => {
                let clarified = format!("{request}\n\n{PLAN_CLARIFICATION}");
                match self.attempt(&clarified, context, &mut diagnostics).await {
                    Some(drafts) => drafts,
                    None => {
                        warn!("Planning fell back to a single catch-all subtask");
                        vec![Draft {
                            id: None,
                            goal: prompt.to_string(),
                            depends_on: Vec::new(),
                        }]
                    }
                }
            }
        };

        let (subtasks, degraded) = order_subtasks(assign_ids(drafts));
        info!(subtasks = subtasks.len(), degraded, "Plan ready");
        Ok(PlanOutcome {
            subtasks,
            diagnostics,
            degraded,
        })
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_drafts(value: &Value) -> Vec<Draft> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match LIST_KEYS.iter().find_map(|k| map.get(*k)) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(goal) if !goal.trim().is_empty() => Some(Draft {
                id: None,
                goal: goal.trim().to_string(),
                depends_on: Vec::new(),
            }),
            Value::Object(map) => {
                let goal = GOAL_KEYS.iter().find_map(|k| map.get(*k).and_then(text_of))?;
                let id = ID_KEYS.iter().find_map(|k| map.get(*k).and_then(text_of));
                let depends_on = DEPENDENCY_KEYS
                    .iter()
                    .find_map(|k| map.get(*k))
                    .and_then(Value::as_array)
                    .map(|deps| deps.iter().filter_map(text_of).collect())
                    .unwrap_or_default();
                Some(Draft {
                    id,
                    goal,
                    depends_on,
                })
            }
            _ => None,
        })
        .collect()
}

/// Keep the first use of every proposed id; give the rest `task_NNN` ids
/// that collide with nothing.
/// Ids end up in logs and script comments; anything beyond a short
/// `[A-Za-z0-9_.-]` token is replaced.
fn is_plain_id(id: &str) -> bool {
    (1..=64).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn assign_ids(drafts: Vec<Draft>) -> Vec<Subtask> {
    let mut taken = HashSet::new();
    let explicit: Vec<Option<String>> = drafts
        .iter()
        .map(|d| {
            d.id.clone()
                .filter(|id| is_plain_id(id))
                .filter(|id| taken.insert(id.clone()))
        })
        .collect();

    let mut next = 1;
    drafts
        .into_iter()
        .zip(explicit)
        .map(|(draft, id)| {
            let id = id.unwrap_or_else(|| loop {
                let candidate = format!("task_{next:03}");
                next += 1;
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            });
            Subtask::new(id, draft.goal).with_dependencies(draft.depends_on)
        })
        .collect()
}

/// Topological order with ties broken by input position.
///
/// Returns the subtasks and whether the edges had to be discarded.
fn order_subtasks(mut subtasks: Vec<Subtask>) -> (Vec<Subtask>, bool) {
    let known: HashSet<String> = subtasks.iter().map(|s| s.id.clone()).collect();
    for subtask in &mut subtasks {
        let mut seen = HashSet::new();
        let id = subtask.id.clone();
        subtask.depends_on.retain(|dep| {
            if !known.contains(dep) {
                debug!(subtask = %id, dependency = %dep, "Dropping unknown dependency");
                return false;
            }
            seen.insert(dep.clone())
        });
    }

    let mut emitted: HashSet<String> = HashSet::new();
    let mut order: Vec<usize> = Vec::with_capacity(subtasks.len());
    while order.len() < subtasks.len() {
        let ready = subtasks.iter().enumerate().position(|(i, s)| {
            !order.contains(&i) && s.depends_on.iter().all(|d| emitted.contains(d))
        });
        let Some(index) = ready else {
            break;
        };
        emitted.insert(subtasks[index].id.clone());
        order.push(index);
    }

    if order.len() < subtasks.len() {
        warn!(
            degraded = true,
            subtasks = subtasks.len(),
            "Subtask dependencies form a cycle, falling back to input order"
        );
        let mut previous: Option<String> = None;
        for subtask in &mut subtasks {
            subtask.depends_on = previous.iter().cloned().collect();
            previous = Some(subtask.id.clone());
        }
        return (subtasks, true);
    }

    let mut slots: Vec<Option<Subtask>> = subtasks.into_iter().map(Some).collect();
    let ordered = order
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect();
    (ordered, false)
}
