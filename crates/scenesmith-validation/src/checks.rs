//! Individual plan checks
//!
//! Each check appends to the shared finding list and never returns early, so a
//! report always covers every check.

use regex::Regex;
use scenesmith_registry::{OperationClass, Registry};
use scenesmith_stage_api::{
    FailureKind, Finding, MappedCall, Provenance, ScriptPlan, ScriptStep, Severity, Subtask,
    SubtaskStatus,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

/// A statement pattern, what it does, and how to get rid of it
type ScriptPattern = (Regex, &'static str, &'static str);

/// Statements that must never reach the executor
static RISKY_PATTERNS: LazyLock<Vec<ScriptPattern>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"\bquit_blender\b").expect("quit pattern is valid"),
            "quits the application",
            "remove the quit call; the executor ends the session",
        ),
        (
            Regex::new(r"\bsave_mainfile\b").expect("save pattern is valid"),
            "overwrites the open file",
            "remove the save call; saving is left to the user",
        ),
        (
            Regex::new(r"\bos\.system\s*\(").expect("os.system pattern is valid"),
            "runs a shell command",
            "remove the shell command; scripts may only call registered operations",
        ),
        (
            Regex::new(r"\bsubprocess\b").expect("subprocess pattern is valid"),
            "spawns a process",
            "remove the subprocess use; scripts may only call registered operations",
        ),
    ]
});

/// API spellings removed from current releases
static DEPRECATED_PATTERNS: LazyLock<Vec<ScriptPattern>> = LazyLock::new(|| {
    vec![(
        Regex::new(r"\bscene\.objects\.active\b").expect("active object pattern is valid"),
        "is removed from current releases",
        "use view_layer.objects.active",
    )]
});

pub(crate) struct Findings(Vec<Finding>);

impl Findings {
    pub(crate) const fn new() -> Self {
        Self(Vec::new())
    }

    fn push(
        &mut self,
        severity: Severity,
        kind: Option<FailureKind>,
        check: &str,
        location: String,
        message: String,
        remediation: String,
    ) {
        self.0.push(Finding {
            severity,
            kind,
            check: check.to_string(),
            location,
            message,
            remediation,
        });
    }

    pub(crate) fn into_inner(self) -> Vec<Finding> {
        self.0
    }
}

/// `(step location, call)` for every call step
fn call_steps(plan: &ScriptPlan) -> impl Iterator<Item = (String, &MappedCall)> {
    plan.steps
        .iter()
        .enumerate()
        .filter_map(|(i, step)| step.as_call().map(|call| (format!("step {}", i + 1), call)))
}

pub(crate) fn unknown_operations(plan: &ScriptPlan, registry: &Registry, out: &mut Findings) {
    for (location, call) in call_steps(plan) {
        if !registry.contains(&call.operation) {
            out.push(
                Severity::Fatal,
                Some(FailureKind::UnknownOperation),
                "unknown_operation",
                location,
                format!("operation '{}' is not registered", call.operation),
                format!(
                    "replace '{}' with a registered operation (scenesmith search)",
                    call.operation
                ),
            );
        }
    }
}

pub(crate) fn creation_order(plan: &ScriptPlan, out: &mut Findings) {
    let mut created: HashSet<&str> = HashSet::new();
    for (location, call) in call_steps(plan) {
        match call.class {
            OperationClass::Creation => {
                if let Some(target) = &call.target {
                    created.insert(target.as_str());
                }
            }
            OperationClass::Mutation => match call.target.as_deref() {
                None => out.push(
                    Severity::Fatal,
                    Some(FailureKind::OrderingViolation),
                    "ordering",
                    location,
                    format!("{} modifies an object no earlier call creates", call.operation),
                    format!(
                        "add a creation call before {} or name the object it should modify",
                        call.operation
                    ),
                ),
                Some(target) if !created.contains(target) => out.push(
                    Severity::Fatal,
                    Some(FailureKind::OrderingViolation),
                    "ordering",
                    location,
                    format!("{} modifies '{target}' before it is created", call.operation),
                    format!("add a creation call for '{target}' before {}", call.operation),
                ),
                Some(_) => {}
            },
            OperationClass::Neutral => {}
        }
    }
}

pub(crate) fn required_params(plan: &ScriptPlan, registry: &Registry, out: &mut Findings) {
    for (location, call) in call_steps(plan) {
        let Some(spec) = registry.get(&call.operation) else {
            continue;
        };
        for param in spec.required_params() {
            if !call.params.contains_key(&param.name) {
                out.push(
                    Severity::Fatal,
                    None,
                    "required_params",
                    location.clone(),
                    format!("{} is missing required parameter '{}'", call.operation, param.name),
                    format!(
                        "supply required parameter '{}' ({}) for {}",
                        param.name, param.param_type, call.operation
                    ),
                );
            }
        }
    }
}

pub(crate) fn undeclared_params(plan: &ScriptPlan, registry: &Registry, out: &mut Findings) {
    for (location, call) in call_steps(plan) {
        let Some(spec) = registry.get(&call.operation) else {
            continue;
        };
        for name in call.params.keys().filter(|name| spec.param(name).is_none()) {
            out.push(
                Severity::Warning,
                None,
                "undeclared_params",
                location.clone(),
                format!("{} does not declare parameter '{name}'; it is not rendered", call.operation),
                format!("remove '{name}' or use a parameter {} declares", call.operation),
            );
        }
    }
}

pub(crate) fn duplicate_targets(plan: &ScriptPlan, out: &mut Findings) {
    let mut first_seen: BTreeMap<&str, String> = BTreeMap::new();
    for (location, call) in call_steps(plan) {
        if call.class != OperationClass::Creation {
            continue;
        }
        let Some(target) = call.target.as_deref() else {
            continue;
        };
        if let Some(first) = first_seen.get(target) {
            out.push(
                Severity::Fatal,
                None,
                "duplicate_targets",
                location,
                format!("'{target}' is already created at {first}"),
                format!("give the second '{target}' a distinct name"),
            );
        } else {
            first_seen.insert(target, location);
        }
    }
}

pub(crate) fn guards(plan: &ScriptPlan, out: &mut Findings) {
    let mut previous: Option<&ScriptStep> = None;
    for (i, step) in plan.steps.iter().enumerate() {
        if let ScriptStep::Call(call) = step
            && call.class == OperationClass::Mutation
        {
            let guarded = matches!(
                previous,
                Some(ScriptStep::Guard { target }) if *target == call.target
            );
            if !guarded {
                out.push(
                    Severity::Fatal,
                    None,
                    "guards",
                    format!("step {}", i + 1),
                    format!("{} has no existence guard", call.operation),
                    format!("guard {} with an existence check on its object", call.operation),
                );
            }
        }
        previous = Some(step);
    }
}

fn scan_script(
    plan: &ScriptPlan,
    patterns: &[ScriptPattern],
    severity: Severity,
    check: &str,
    out: &mut Findings,
) {
    for (number, line) in plan.script.lines().enumerate() {
        for (pattern, why, fix) in patterns {
            if let Some(m) = pattern.find(line) {
                out.push(
                    severity,
                    None,
                    check,
                    format!("line {}", number + 1),
                    format!("'{}' {why}", m.as_str()),
                    (*fix).to_string(),
                );
            }
        }
    }
}

pub(crate) fn risky_statements(plan: &ScriptPlan, out: &mut Findings) {
    scan_script(plan, &RISKY_PATTERNS, Severity::Fatal, "risky_statement", out);
}

pub(crate) fn deprecated_statements(plan: &ScriptPlan, out: &mut Findings) {
    scan_script(plan, &DEPRECATED_PATTERNS, Severity::Warning, "deprecated_api", out);
}

pub(crate) fn unsatisfied_subtasks(subtasks: &[Subtask], out: &mut Findings) {
    for subtask in subtasks.iter().filter(|s| s.status == SubtaskStatus::Unsatisfied) {
        out.push(
            Severity::Warning,
            Some(FailureKind::UnsatisfiableSubtask),
            "unsatisfied_subtask",
            format!("subtask {}", subtask.id),
            format!("no operation was mapped for '{}'", subtask.goal),
            format!("rephrase '{}' in terms of objects, shapes or colors", subtask.goal),
        );
    }
}

pub(crate) fn dropped_calls(calls: &[MappedCall], out: &mut Findings) {
    for call in calls {
        if let Provenance::Dropped { proposed, reason } = &call.provenance {
            out.push(
                Severity::Warning,
                Some(FailureKind::UnknownOperation),
                "dropped_call",
                format!("subtask {}", call.subtask_id),
                format!("'{proposed}' was dropped: {reason}"),
                format!("look up an operation for '{proposed}' with scenesmith search"),
            );
        }
    }
}
