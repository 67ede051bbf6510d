//! Script synthesis
//!
//! Calls are ordered by subtask position, then creation before everything
//! else, then proposal order. Every mutation gets an existence guard that
//! skips the call when its object is missing.

mod render;

use scenesmith_registry::{OperationClass, Registry};
use scenesmith_stage_api::{
    MappedCall, ScriptPlan, ScriptStep, StageError, StageId, Subtask, Synthesizer,
};
use std::collections::HashMap;
use tracing::debug;

use render::ScriptWriter;

/// Deterministic synthesizer emitting a Blender Python script
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonSynthesizer;

impl PythonSynthesizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

const fn class_rank(class: OperationClass) -> u8 {
    match class {
        OperationClass::Creation => 0,
        OperationClass::Mutation | OperationClass::Neutral => 1,
    }
}

fn linearize<'a>(subtasks: &[Subtask], calls: &'a [MappedCall]) -> Vec<&'a MappedCall> {
    let position: HashMap<&str, usize> = subtasks
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut kept: Vec<&MappedCall> = calls.iter().filter(|c| !c.is_dropped()).collect();
    kept.sort_by_key(|c| {
        (
            position.get(c.subtask_id.as_str()).copied().unwrap_or(subtasks.len()),
            class_rank(c.class),
            c.order,
        )
    });
    kept
}

impl Synthesizer for PythonSynthesizer {
    fn synthesize(
        &self,
        subtasks: &[Subtask],
        calls: &[MappedCall],
        registry: &Registry,
    ) -> Result<ScriptPlan, StageError> {
        let mut steps = Vec::new();
        let mut writer = ScriptWriter::new();

        for call in linearize(subtasks, calls) {
            let spec = registry.get(&call.operation).ok_or_else(|| StageError::Internal {
                stage: StageId::Synthesizing,
                reason: format!("operation '{}' is not registered", call.operation),
            })?;

            let guarded = call.class == OperationClass::Mutation;
            if guarded {
                steps.push(ScriptStep::Guard {
                    target: call.target.clone(),
                });
            }
            writer.call(call, spec, guarded);
            steps.push(ScriptStep::Call(call.clone()));
        }

        let script = writer.finish();
        let fingerprint = blake3::hash(script.as_bytes()).to_hex().to_string();
        debug!(steps = steps.len(), fingerprint = %fingerprint, "Script synthesized");

        Ok(ScriptPlan {
            steps,
            script,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesmith_registry::fixtures::blender_registry;
    use scenesmith_stage_api::{ColorSpec, Provenance};
    use serde_json::json;
    use std::collections::BTreeMap;

    const SPHERE: &str = "bpy.ops.mesh.primitive_uv_sphere_add";
    const CUBE: &str = "bpy.ops.mesh.primitive_cube_add";
    const MATERIAL: &str = "bpy.ops.object.material_slot_add";
    const TRANSLATE: &str = "bpy.ops.transform.translate";

    fn call(subtask: &str, operation: &str, class: OperationClass, target: &str, order: usize) -> MappedCall {
        MappedCall {
            subtask_id: subtask.to_string(),
            operation: operation.to_string(),
            params: BTreeMap::new(),
            provenance: Provenance::Accepted,
            class,
            target: Some(target.to_string()),
            color: None,
            order,
        }
    }

    fn operations(plan: &ScriptPlan) -> Vec<&str> {
        plan.calls().map(|c| c.operation.as_str()).collect()
    }

    #[test]
    fn test_red_sphere_plan() {
        let subtasks = vec![Subtask::new("task_001", "create a red sphere")];
        let mut material = call("task_001", MATERIAL, OperationClass::Mutation, "Sphere", 0);
        material.color = Some(ColorSpec::rgba(1.0, 0.0, 0.0, 1.0));
        let mut sphere = call("task_001", SPHERE, OperationClass::Creation, "Sphere", 1);
        sphere.params.insert("radius".to_string(), json!(1.0));

        let plan = PythonSynthesizer::new()
            .synthesize(&subtasks, &[material, sphere], &blender_registry())
            .unwrap();

        assert_eq!(plan.steps.len(), 3);
        assert!(matches!(&plan.steps[0], ScriptStep::Call(c) if c.operation == SPHERE));
        assert_eq!(
            plan.steps[1],
            ScriptStep::Guard {
                target: Some("Sphere".to_string())
            }
        );
        assert!(matches!(&plan.steps[2], ScriptStep::Call(c) if c.operation == MATERIAL));

        let script = &plan.script;
        assert!(script.starts_with("import bpy"));
        assert!(script.contains("bpy.ops.mesh.primitive_uv_sphere_add(radius=1.0)"));
        assert!(script.contains("obj.name = \"Sphere\""));
        assert!(script.contains("obj = scenesmith_object(\"Sphere\")"));
        assert!(script.contains("scenesmith_apply_color(obj, (1.0, 0.0, 0.0, 1.0))"));
        let creation = script.find("primitive_uv_sphere_add(").unwrap();
        let material_call = script.find("material_slot_add(").unwrap();
        assert!(creation < material_call);
    }

    #[test]
    fn test_subtask_order_then_class_then_proposal() {
        let subtasks = vec![Subtask::new("b", "second"), Subtask::new("a", "first")];
        let calls = vec![
            call("a", CUBE, OperationClass::Creation, "Cube", 0),
            call("b", TRANSLATE, OperationClass::Mutation, "Sphere", 0),
            call("b", SPHERE, OperationClass::Creation, "Sphere", 2),
            call("b", CUBE, OperationClass::Creation, "Cube.001", 1),
        ];
        let plan = PythonSynthesizer::new()
            .synthesize(&subtasks, &calls, &blender_registry())
            .unwrap();
        assert_eq!(operations(&plan), vec![CUBE, SPHERE, TRANSLATE, CUBE]);
        let targets: Vec<_> = plan.calls().filter_map(|c| c.target.as_deref()).collect();
        assert_eq!(targets, vec!["Cube.001", "Sphere", "Sphere", "Cube"]);
    }

    #[test]
    fn test_dropped_calls_are_not_emitted() {
        let subtasks = vec![Subtask::new("task_001", "a cube")];
        let mut dropped = call("task_001", "bpy.ops.mesh.summon", OperationClass::Neutral, "X", 0);
        dropped.provenance = Provenance::Dropped {
            proposed: "summon".to_string(),
            reason: "no close match".to_string(),
        };
        let calls = vec![dropped, call("task_001", CUBE, OperationClass::Creation, "Cube", 1)];
        let plan = PythonSynthesizer::new()
            .synthesize(&subtasks, &calls, &blender_registry())
            .unwrap();
        assert_eq!(operations(&plan), vec![CUBE]);
        assert!(!plan.script.contains("summon"));
    }

    #[test]
    fn test_unregistered_operation_is_internal_error() {
        let subtasks = vec![Subtask::new("task_001", "a teapot")];
        let calls = vec![call("task_001", "bpy.ops.mesh.primitive_teapot_add", OperationClass::Creation, "Teapot", 0)];
        let err = PythonSynthesizer::new()
            .synthesize(&subtasks, &calls, &blender_registry())
            .unwrap_err();
        assert!(matches!(err, StageError::Internal { stage: StageId::Synthesizing, .. }));
    }

    #[test]
    fn test_mutation_without_target_guards_active_object() {
        let subtasks = vec![Subtask::new("task_001", "move it")];
        let mut translate = call("task_001", TRANSLATE, OperationClass::Mutation, "", 0);
        translate.target = None;
        translate.params.insert("value".to_string(), json!([0.0, 0.0, 1.0]));
        let plan = PythonSynthesizer::new()
            .synthesize(&subtasks, &[translate], &blender_registry())
            .unwrap();
        assert_eq!(plan.steps[0], ScriptStep::Guard { target: None });
        assert!(plan.script.contains("obj = scenesmith_object(None)"));
        assert!(plan.script.contains("bpy.ops.transform.translate(value=(0.0, 0.0, 1.0))"));
    }

    #[test]
    fn test_undeclared_params_are_not_rendered() {
        let subtasks = vec![Subtask::new("task_001", "a cube")];
        let mut cube = call("task_001", CUBE, OperationClass::Creation, "Cube", 0);
        cube.params.insert("size".to_string(), json!(2.0));
        cube.params.insert("wobble".to_string(), json!(3));
        let plan = PythonSynthesizer::new()
            .synthesize(&subtasks, &[cube], &blender_registry())
            .unwrap();
        assert!(plan.script.contains("bpy.ops.mesh.primitive_cube_add(size=2.0)"));
        assert!(!plan.script.contains("wobble"));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let subtasks = vec![Subtask::new("task_001", "a cube")];
        let calls = vec![call("task_001", CUBE, OperationClass::Creation, "Cube", 0)];
        let registry = blender_registry();
        let first = PythonSynthesizer::new().synthesize(&subtasks, &calls, &registry).unwrap();
        let second = PythonSynthesizer::new().synthesize(&subtasks, &calls, &registry).unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.fingerprint.len(), 64);
        assert_eq!(first.fingerprint, blake3::hash(first.script.as_bytes()).to_hex().to_string());
    }
}
