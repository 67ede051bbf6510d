//! Quality validation for synthesized scripts
//!
//! [`QualityValidator`] inspects a [`ScriptPlan`] before it is handed to the
//! executor. Checks are independent: a plan with an unknown operation is still
//! checked for ordering, parameters, guards and risky statements, so one
//! report lists everything wrong with it.

mod checks;

use scenesmith_registry::Registry;
use scenesmith_stage_api::{
    Finding, MappedCall, ScriptPlan, Severity, Subtask, ValidationReport, Validator,
};
use tracing::debug;

use checks::Findings;

/// Static checker for script plans
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityValidator {
    strict: bool,
}

impl QualityValidator {
    /// `strict` escalates every warning to fatal.
    #[must_use]
    pub const fn new(strict: bool) -> Self {
        Self { strict }
    }

    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Validator for QualityValidator {
    fn validate(
        &self,
        plan: &ScriptPlan,
        subtasks: &[Subtask],
        calls: &[MappedCall],
        registry: &Registry,
    ) -> ValidationReport {
        let mut out = Findings::new();

        checks::unknown_operations(plan, registry, &mut out);
        checks::creation_order(plan, &mut out);
        checks::required_params(plan, registry, &mut out);
        checks::duplicate_targets(plan, &mut out);
        checks::guards(plan, &mut out);
        checks::undeclared_params(plan, registry, &mut out);
        checks::risky_statements(plan, &mut out);
        checks::deprecated_statements(plan, &mut out);
        checks::unsatisfied_subtasks(subtasks, &mut out);
        checks::dropped_calls(calls, &mut out);

        let mut findings = out.into_inner();
        if self.strict {
            for finding in &mut findings {
                finding.severity = Severity::Fatal;
            }
        }

        let report = ValidationReport::from_findings(findings);
        debug!(
            passed = report.passed,
            fatal = report.fatal().count(),
            warnings = report.warnings().count(),
            "Validation complete"
        );
        report
    }
}

/// One line per finding, fatal first
#[must_use]
pub fn summarize(report: &ValidationReport) -> String {
    let mut findings: Vec<&Finding> = report.findings.iter().collect();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
