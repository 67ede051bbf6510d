//! End-to-end pipeline scenarios against a scripted oracle
//!
//! Every stage is the production implementation; only the oracle is canned.
//! Replies are chosen by the instructions in the user message, so planning
//! and mapping can be scripted independently.

use proptest::prelude::*;
use scenesmith::fixtures::blender_registry;
use scenesmith::{
    Config, FailureKind, Orchestrator, PipelineRun, Provenance, RegistryHandle, RunState,
    StageId, Stages, SubtaskStatus,
};
use scenesmith_llm::{BackendOracle, OracleRequest, ScriptedBackend, ScriptedReply};
use std::sync::Arc;
use std::time::Duration;

const SPHERE: &str = "bpy.ops.mesh.primitive_uv_sphere_add";
const CUBE: &str = "bpy.ops.mesh.primitive_cube_add";
const MATERIAL: &str = "bpy.ops.object.material_slot_add";

fn is_planning(req: &OracleRequest) -> bool {
    req.messages
        .iter()
        .any(|m| m.content.starts_with("Break the request"))
}

/// Oracle answering planning with `plan` and every mapping call with `map`
fn scripted(plan: &str, map: &str) -> Arc<ScriptedBackend> {
    let plan = plan.to_string();
    let map = map.to_string();
    Arc::new(ScriptedBackend::responder(move |req| {
        if is_planning(req) {
            ScriptedReply::text(plan.clone())
        } else {
            ScriptedReply::text(map.clone())
        }
    }))
}

fn orchestrator(backend: Arc<ScriptedBackend>) -> Orchestrator {
    let oracle = Arc::new(BackendOracle::new(backend, "", Duration::from_secs(5)));
    Orchestrator::new(
        RegistryHandle::new(blender_registry()),
        Stages::with_oracle(oracle, &Config::defaults()),
    )
}

async fn run(plan: &str, map: &str, prompt: &str) -> (PipelineRun, Arc<ScriptedBackend>) {
    let backend = scripted(plan, map);
    let run = orchestrator(backend.clone()).run_async(prompt).await;
    (run, backend)
}

#[tokio::test]
async fn test_red_sphere() {
    let (run, _) = run(
        r#"{"subtasks": [{"id": "task_001", "goal": "Create a red sphere"}]}"#,
        &format!(
            r#"{{"calls": [{{"operation": "{SPHERE}", "parameters": {{"radius": 1.0}}}},
                          {{"operation": "{MATERIAL}", "target": "Sphere", "color": "red"}}]}}"#
        ),
        "Create a red sphere",
    )
    .await;

    assert_eq!(run.state, RunState::Succeeded, "{:?}", run.failure);
    assert_eq!(run.subtasks.len(), 1);
    assert_eq!(run.subtasks[0].status, SubtaskStatus::Satisfied);
    assert!(run.calls.iter().all(|c| c.provenance == Provenance::Accepted));

    let script = run.script().unwrap();
    assert!(script.starts_with("import bpy"));
    let sphere_at = script.find(SPHERE).unwrap();
    let material_at = script.find(MATERIAL).unwrap();
    assert!(sphere_at < material_at);
    assert!(script.contains("radius=1.0"));
    assert!(script.contains("(1.0, 0.0, 0.0, 1.0)"));
    assert!(run.report().unwrap().passed);
}

#[tokio::test]
async fn test_material_proposed_before_sphere_still_succeeds() {
    let (run, _) = run(
        r#"{"subtasks": [{"id": "task_001", "goal": "Create a red sphere"}]}"#,
        &format!(
            r#"{{"calls": [{{"operation": "{MATERIAL}", "color": "red"}},
                          {{"operation": "{SPHERE}"}}]}}"#
        ),
        "Create a red sphere",
    )
    .await;

    assert_eq!(run.state, RunState::Succeeded, "{:?}", run.failure);
    assert!(!run.retried);
    assert_eq!(run.calls[0].target.as_deref(), Some("Sphere"));
    let script = run.script().unwrap();
    assert!(script.find(SPHERE).unwrap() < script.find(MATERIAL).unwrap());
    assert!(script.contains("obj = scenesmith_object(\"Sphere\")"));
}

#[tokio::test]
async fn test_multiline_subtask_id_cannot_add_statements() {
    let (run, _) = run(
        r#"{"subtasks": [{"id": "t1\n__import__('shutil').rmtree('/tmp/x')\n#", "goal": "add a cube"}]}"#,
        &format!(r#"[{{"operation": "{CUBE}"}}]"#),
        "add a cube",
    )
    .await;

    assert!(run.succeeded(), "{:?}", run.failure);
    assert_eq!(run.subtasks[0].id, "task_001");
    let script = run.script().unwrap();
    assert!(
        script
            .lines()
            .all(|line| !line.trim_start().starts_with("__import__"))
    );
    assert!(script.contains(&format!("# task_001: {CUBE}")));
}

#[tokio::test]
async fn test_pseudo_json_is_repaired_and_alias_substituted() {
    let (run, _) = run(r#"["add a cube"]"#, "{'op': 'add_cube'}", "add a cube").await;

    assert!(run.succeeded(), "{:?}", run.failure);
    assert_eq!(run.calls.len(), 1);
    assert_eq!(run.calls[0].operation, CUBE);
    assert_eq!(
        run.calls[0].provenance,
        Provenance::Substituted {
            from: "add_cube".to_string()
        }
    );
    assert_eq!(run.calls[0].target.as_deref(), Some("Cube"));
    assert!(run.script().unwrap().contains(CUBE));
}

#[tokio::test]
async fn test_unknown_operation_is_dropped_not_emitted() {
    let (run, _) = run(
        r#"["a sphere and a teapot"]"#,
        &format!(
            r#"[{{"operation": "{SPHERE}"}}, {{"operation": "bpy.ops.mesh.primitive_teapot_add"}}]"#
        ),
        "a sphere and a teapot",
    )
    .await;

    assert!(run.succeeded(), "{:?}", run.failure);
    assert_eq!(run.subtasks[0].status, SubtaskStatus::PartiallySatisfied);
    assert!(matches!(
        run.calls[1].provenance,
        Provenance::Dropped { ref proposed, .. } if proposed == "bpy.ops.mesh.primitive_teapot_add"
    ));
    assert!(!run.script().unwrap().contains("teapot"));

    let report = run.report().unwrap();
    assert!(report.passed);
    assert!(report.warnings().any(|f| f.kind == Some(FailureKind::UnknownOperation)));
    assert!(
        run.diagnostics
            .iter()
            .any(|d| d.kind == FailureKind::UnknownOperation && d.stage == StageId::Mapping)
    );
}

#[tokio::test]
async fn test_ordering_violation_retried_then_failed() {
    let (run, backend) = run(
        r#"["paint the ghost red"]"#,
        &format!(r#"{{"calls": [{{"operation": "{MATERIAL}", "target": "Ghost", "color": "red"}}]}}"#),
        "paint the ghost red",
    )
    .await;

    assert_eq!(run.state, RunState::Failed);
    assert!(run.retried);
    assert_eq!(run.reports.len(), 2);
    for report in &run.reports {
        assert!(!report.passed);
        assert!(report.has_kind(FailureKind::OrderingViolation));
    }
    let failure = run.failure.as_ref().unwrap();
    assert_eq!(failure.stage, StageId::Validating);
    assert!(failure.cause.contains("ordering"));

    // Plan once, map twice; nothing else reaches the oracle
    assert_eq!(backend.recorded_prompts().len(), 3);
    // The partial results survive the failure
    assert!(run.plan.is_some());
    assert_eq!(run.calls.len(), 1);
}

#[tokio::test]
async fn test_planner_degrades_to_catch_all_subtask() {
    let (run, backend) = run(
        "I would love to help with that scene!",
        &format!(r#"[{{"operation": "{SPHERE}"}}]"#),
        "a sphere",
    )
    .await;

    assert!(run.succeeded(), "{:?}", run.failure);
    assert_eq!(run.subtasks.len(), 1);
    assert_eq!(run.subtasks[0].goal, "a sphere");
    assert!(
        run.diagnostics
            .iter()
            .any(|d| d.stage == StageId::Planning && d.kind == FailureKind::MalformedResponse)
    );
    // Two planning attempts, then one mapping call
    assert_eq!(backend.recorded_prompts().len(), 3);
}

#[tokio::test]
async fn test_oracle_outage_leaves_heuristic_guess() {
    let backend = Arc::new(ScriptedBackend::repeating(ScriptedReply::transport_error(
        "connection reset",
    )));
    let run = orchestrator(backend).run_async("a blue cube").await;

    assert!(run.succeeded(), "{:?}", run.failure);
    assert_eq!(run.calls.len(), 1);
    assert_eq!(run.calls[0].operation, CUBE);
    assert!(
        run.diagnostics
            .iter()
            .any(|d| d.kind == FailureKind::OracleFailure)
    );
}

#[tokio::test]
async fn test_identical_replies_produce_identical_scripts() {
    let plan = r#"{"subtasks": [{"id": "task_001", "goal": "Create a red sphere"}]}"#;
    let map = format!(r#"[{{"operation": "{SPHERE}", "color": [1, 0, 0, 1]}}]"#);
    let (first, _) = run(plan, &map, "Create a red sphere").await;
    let (second, _) = run(plan, &map, "Create a red sphere").await;

    let first_plan = first.plan.as_ref().unwrap();
    let second_plan = second.plan.as_ref().unwrap();
    assert_eq!(first_plan.script, second_plan.script);
    assert_eq!(first_plan.fingerprint, second_plan.fingerprint);
    assert_ne!(first.id, second.id);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whatever the oracle says, a run ends in a terminal state with at least
    /// one subtask and never emits an unregistered operation.
    #[test]
    fn prop_any_reply_reaches_terminal_state(
        plan in ".{0,80}",
        map in ".{0,80}",
        prompt in "[a-z]{1,12}( [a-z]{1,12}){0,4}",
    ) {
        let run = orchestrator(scripted(&plan, &map)).run(&prompt);

        prop_assert!(run.state.is_terminal());
        prop_assert!(!run.subtasks.is_empty());
        let registry = blender_registry();
        if let Some(plan) = &run.plan {
            for call in plan.calls() {
                prop_assert!(registry.contains(&call.operation));
            }
        }
    }
}
