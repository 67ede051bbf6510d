//! Run command implementation
//!
//! Handles `scenesmith run "<prompt>"`: one pipeline run, a human summary or
//! the JSON run record, and the script written out on success.

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::{info, warn};

use super::common::load_registry;
use super::json_emit::emit_run_json;

use crate::error::ScenesmithError;
use crate::{Config, Orchestrator, PipelineRun, Provenance, RegistryHandle, write_file_atomic};

/// Execute the run command
pub async fn execute_run_command(
    prompt: &str,
    out: Option<&str>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let registry = RegistryHandle::new(load_registry(config)?);
    let orchestrator = Orchestrator::from_config(config, registry)
        .context("Failed to configure the oracle")?;

    let cancel = orchestrator.cancel_handle();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next stage boundary");
            cancel.cancel();
        }
    });

    let run = orchestrator.run_async(prompt).await;
    listener.abort();

    if json {
        println!("{}", emit_run_json(&run)?);
    } else {
        print!("{}", render_summary(&run));
    }

    if let Some(failure) = &run.failure {
        return Err(ScenesmithError::RunFailed {
            stage: failure.stage,
            cause: failure.cause.clone(),
        }
        .into());
    }

    if let Some(script) = run.script() {
        match out {
            Some(path) => {
                let path = Utf8Path::new(path);
                write_file_atomic(path, script)
                    .with_context(|| format!("Failed to write script to {path}"))?;
                info!(path = %path, "Script written");
                if !json {
                    println!("Script written to {path}");
                }
            }
            None if !json => {
                println!();
                print!("{script}");
            }
            None => {}
        }
    }
    Ok(())
}

/// Multi-line human summary of a run
fn render_summary(run: &PipelineRun) -> String {
    let mut out = String::new();
    out.push_str(&format!("Run {}: {}\n", run.id, run.state));
    if run.degraded {
        out.push_str("  Plan degraded: dependencies could not be ordered\n");
    }

    out.push_str(&format!("  Subtasks ({}):\n", run.subtasks.len()));
    for subtask in &run.subtasks {
        out.push_str(&format!(
            "    {} [{}] {}\n",
            subtask.id, subtask.status, subtask.goal
        ));
    }

    if !run.calls.is_empty() {
        out.push_str(&format!("  Calls ({}):\n", run.calls.len()));
        for call in &run.calls {
            let target = call.target.as_deref().unwrap_or("active object");
            let note = match &call.provenance {
                Provenance::Accepted => String::new(),
                Provenance::Substituted { from } => format!(" (substituted for {from})"),
                Provenance::Dropped { reason, .. } => format!(" (dropped: {reason})"),
            };
            out.push_str(&format!(
                "    {}: {} -> {target}{note}\n",
                call.subtask_id, call.operation
            ));
        }
    }

    if let Some(report) = run.report() {
        let summary = crate::validation::summarize(report);
        if !summary.is_empty() {
            out.push_str("  Findings:\n");
            for line in summary.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
        let notes = report.remediation_notes();
        if !notes.is_empty() {
            out.push_str("  Suggestions:\n");
            for note in notes {
                out.push_str(&format!("    - {note}\n"));
            }
        }
    }
    if run.retried {
        out.push_str("  Mapping was retried once after validation feedback\n");
    }
    if let Some(failure) = &run.failure {
        out.push_str(&format!("  Failed in {}: {}\n", failure.stage, failure.cause));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blender_registry;
    use crate::{RunState, StageId};
    use std::sync::Arc;

    use scenesmith_llm::{BackendOracle, ScriptedBackend, ScriptedReply};
    use scenesmith_orchestrator::Stages;
    use std::time::Duration;

    fn orchestrator(replies: Vec<ScriptedReply>) -> Orchestrator {
        let backend = Arc::new(ScriptedBackend::new(replies));
        let oracle = Arc::new(BackendOracle::new(backend, "scripted", Duration::from_secs(5)));
        Orchestrator::new(
            RegistryHandle::new(blender_registry()),
            Stages::with_oracle(oracle, &Config::defaults()),
        )
    }

    #[tokio::test]
    async fn test_summary_lists_subtasks_and_calls() {
        let run = orchestrator(vec![
            ScriptedReply::text(r#"["create a red sphere"]"#),
            ScriptedReply::text(
                r#"[{"operation": "bpy.ops.mesh.primitive_uv_sphere_add", "params": {"radius": 1.0}}]"#,
            ),
        ])
        .run_async("create a red sphere")
        .await;

        assert_eq!(run.state, RunState::Succeeded, "{:?}", run.failure);
        let summary = render_summary(&run);
        assert!(summary.contains(": succeeded\n"));
        assert!(summary.contains("[satisfied] create a red sphere"));
        assert!(summary.contains("bpy.ops.mesh.primitive_uv_sphere_add -> "));
    }

    #[test]
    fn test_summary_reports_failure() {
        let run: PipelineRun = serde_json::from_value(serde_json::json!({
            "id": "run-x",
            "prompt": "p",
            "state": "failed",
            "history": ["planning", "failed"],
            "started_at": "2026-01-01T00:00:00Z",
            "finished_at": "2026-01-01T00:00:01Z",
            "subtasks": [],
            "degraded": false,
            "calls": [],
            "plan": null,
            "reports": [],
            "diagnostics": [],
            "stages": [],
            "retried": false,
            "failure": {"stage": "planning", "cause": "prompt is empty"}
        }))
        .unwrap();
        let summary = render_summary(&run);
        assert!(summary.contains("Failed in planning: prompt is empty"));
        assert_eq!(run.failure.as_ref().unwrap().stage, StageId::Planning);
    }

    #[test]
    fn test_summary_lists_suggestions() {
        let run: PipelineRun = serde_json::from_value(serde_json::json!({
            "id": "run-y",
            "prompt": "paint the ghost red",
            "state": "failed",
            "history": ["planning", "mapping", "synthesizing", "validating", "failed"],
            "started_at": "2026-01-01T00:00:00Z",
            "finished_at": "2026-01-01T00:00:01Z",
            "subtasks": [],
            "degraded": false,
            "calls": [],
            "plan": null,
            "reports": [{
                "passed": false,
                "findings": [{
                    "severity": "fatal",
                    "check": "ordering",
                    "location": "step 1",
                    "message": "mutation of 'Ghost' before its creation",
                    "remediation": "add a creation call for 'Ghost' before bpy.ops.object.material_slot_add"
                }]
            }],
            "diagnostics": [],
            "stages": [],
            "retried": true,
            "failure": {"stage": "validating", "cause": "ordering"}
        }))
        .unwrap();
        let summary = render_summary(&run);
        assert!(summary.contains(
            "  Suggestions:\n    - add a creation call for 'Ghost' before bpy.ops.object.material_slot_add\n"
        ));
    }
}
