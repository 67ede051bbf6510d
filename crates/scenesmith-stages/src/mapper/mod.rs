//! Operation Mapper
//!
//! For one subtask the mapper asks the oracle for a JSON proposal, repairs and
//! extracts it, and validates every proposed call against the registry:
//! exact names and aliases are accepted, unknown names are substituted by the
//! nearest registered operation above the similarity floor or dropped. When
//! nothing usable comes back, a one-call heuristic guess from the subtask
//! text stands in. A subtask with no surviving call is unsatisfied; the run
//! continues either way.

pub mod archetype;
pub mod color;
mod params;
mod proposal;
mod resolve;

use async_trait::async_trait;
use scenesmith_llm::Oracle;
use scenesmith_registry::{OperationClass, OperationSpec, Registry};
use scenesmith_repair::RepairChain;
use scenesmith_stage_api::{
    Diagnostic, FailureKind, MappedCall, Mapper, MappingOutcome, Provenance, StageError, StageId,
    Subtask, SubtaskStatus, TargetScope,
};
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::prompts::MAP_INSTRUCTIONS;
use archetype::{archetype_in, default_object_name, primitive_or_generic};
use color::{color_from_value, extract_color};
use params::{apply_safe_defaults, clean_params};
use proposal::{Proposal, extract};
use resolve::{Resolution, resolve};

const MATERIAL_SLOT_ADD: &str = "bpy.ops.object.material_slot_add";

/// Mapper backed by the language-model oracle
pub struct OracleMapper {
    oracle: Arc<dyn Oracle>,
    repair: RepairChain,
    top_k: usize,
    similarity_floor: f64,
}

impl OracleMapper {
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, top_k: usize, similarity_floor: f64) -> Self {
        Self {
            oracle,
            repair: RepairChain::standard(),
            top_k,
            similarity_floor,
        }
    }

    /// Top-K candidates for the subtask, one per line
    fn registry_excerpt(&self, subtask: &Subtask, registry: &Registry) -> String {
        let mut excerpt = String::from("Candidate operations:\n");
        for hit in registry.search(&subtask.goal, self.top_k) {
            if let Some(spec) = registry.get(&hit.name) {
                let _ = writeln!(excerpt, "- {}: {}", signature(spec), spec.description);
            }
        }
        excerpt
    }

    async fn propose(
        &self,
        subtask: &Subtask,
        registry: &Registry,
        feedback: Option<&str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Proposal> {
        let mut context = self.registry_excerpt(subtask, registry);
        if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
            let _ = write!(
                context,
                "\nThe previous script for this request failed validation:\n{feedback}\n"
            );
        }
        let prompt = format!("{MAP_INSTRUCTIONS}\n\nSubtask {}: {}", subtask.id, subtask.goal);

        let proposals = match self.oracle.complete(&prompt, Some(&context)).await {
            Ok(text) => match self.repair.repair(&text) {
                Ok(repaired) => {
                    debug!(
                        subtask = %subtask.id,
                        strategy = %repaired.strategy,
                        "Parsed mapping proposal"
                    );
                    extract(&repaired.value)
                }
                Err(failure) => {
                    warn!(subtask = %subtask.id, attempts = failure.attempts.len(), "Mapping response survived no repair strategy");
                    diagnostics.push(
                        Diagnostic::new(FailureKind::MalformedResponse, StageId::Mapping, failure.to_string())
                            .for_subtask(&subtask.id),
                    );
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(subtask = %subtask.id, error = %e, "Oracle failed during mapping");
                diagnostics.push(
                    Diagnostic::new(FailureKind::OracleFailure, StageId::Mapping, e.to_string())
                        .for_subtask(&subtask.id),
                );
                Vec::new()
            }
        };

        if !proposals.is_empty() {
            return proposals;
        }
        let guess = heuristic_guess(&subtask.goal);
        debug!(subtask = %subtask.id, guessed = guess.is_some(), "Using heuristic guess");
        guess.into_iter().collect()
    }

    /// Registered operation for a proposal, or the reason it was dropped
    fn resolve_proposal<'r>(
        &self,
        proposal: &Proposal,
        registry: &'r Registry,
    ) -> Result<(&'r OperationSpec, Provenance), String> {
        let from_archetype = |archetype: &str| {
            let primitive = primitive_or_generic(archetype);
            registry.get(primitive)
        };

        let Some(raw) = proposal.operation.as_deref() else {
            let archetype = proposal.archetype.as_deref().unwrap_or_default();
            return from_archetype(archetype)
                .map(|spec| {
                    let provenance = Provenance::Substituted {
                        from: format!("primitive={archetype}"),
                    };
                    (spec, provenance)
                })
                .ok_or_else(|| format!("no registered primitive for '{archetype}'"));
        };

        let resolution = resolve(raw, registry, self.similarity_floor);
        let substituted = || Provenance::Substituted {
            from: raw.to_string(),
        };
        match resolution {
            Resolution::Exact(name) => registry
                .get(&name)
                .map(|spec| (spec, Provenance::Accepted))
                .ok_or_else(|| format!("'{name}' vanished from the registry")),
            Resolution::Alias(ref name) => registry
                .get(name)
                .map(|spec| (spec, substituted()))
                .ok_or_else(|| format!("alias target '{name}' is not registered")),
            _ if proposal.archetype.is_some() => proposal
                .archetype
                .as_deref()
                .and_then(from_archetype)
                .map(|spec| (spec, substituted()))
                .ok_or_else(|| format!("no registered primitive for '{raw}'")),
            Resolution::Nearest { name, similarity } => {
                debug!(proposed = raw, substitute = %name, similarity, "Substituting nearest operation");
                registry
                    .get(&name)
                    .map(|spec| (spec, substituted()))
                    .ok_or_else(|| format!("'{name}' vanished from the registry"))
            }
            Resolution::Unknown { best: Some((name, similarity)) } => Err(format!(
                "closest operation '{name}' is only {similarity:.2} similar"
            )),
            Resolution::Unknown { best: None } => Err("no similar operation".to_string()),
        }
    }

    fn map_proposal(
        &self,
        order: usize,
        proposal: Proposal,
        subtask: &Subtask,
        registry: &Registry,
        scope: &mut TargetScope,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> MappedCall {
        let proposed_name = proposal.operation.clone().unwrap_or_else(|| {
            format!("primitive={}", proposal.archetype.as_deref().unwrap_or_default())
        });

        let (spec, provenance) = match self.resolve_proposal(&proposal, registry) {
            Ok(resolved) => resolved,
            Err(reason) => {
                warn!(subtask = %subtask.id, proposed = %proposed_name, reason = %reason, "Dropping proposed call");
                diagnostics.push(
                    Diagnostic::new(
                        FailureKind::UnknownOperation,
                        StageId::Mapping,
                        format!("dropped '{proposed_name}': {reason}"),
                    )
                    .for_subtask(&subtask.id),
                );
                return MappedCall {
                    subtask_id: subtask.id.clone(),
                    operation: proposed_name.clone(),
                    params: proposal.params.into_iter().collect(),
                    provenance: Provenance::Dropped {
                        proposed: proposed_name,
                        reason,
                    },
                    class: OperationClass::Neutral,
                    target: proposal.target,
                    color: None,
                    order,
                };
            }
        };

        let mut params = clean_params(&proposal.params, spec);
        apply_safe_defaults(&mut params, spec);

        let class = spec.class();
        let target = match class {
            OperationClass::Creation => Some(match proposal.target.as_deref() {
                Some(name) => scope.claim_explicit(name),
                None => scope.claim_default(&default_object_name(&spec.name)),
            }),
            // Implicit mutation targets are bound once the whole subtask is mapped
            OperationClass::Mutation | OperationClass::Neutral => proposal.target.clone(),
        };

        let color = proposal.color.as_ref().map(color_from_value).or_else(|| {
            spec.has_tag("material")
                .then(|| extract_color(&subtask.goal))
                .flatten()
        });

        MappedCall {
            subtask_id: subtask.id.clone(),
            operation: spec.name.clone(),
            params,
            provenance,
            class,
            target,
            color,
            order,
        }
    }
}

#[async_trait]
impl Mapper for OracleMapper {
    async fn map(
        &self,
        subtask: &Subtask,
        registry: &Registry,
        scope: &mut TargetScope,
        feedback: Option<&str>,
    ) -> Result<MappingOutcome, StageError> {
        let mut diagnostics = Vec::new();
        let proposals = self.propose(subtask, registry, feedback, &mut diagnostics).await;
        let earlier = scope.latest().map(str::to_string);

        let mut calls: Vec<MappedCall> = proposals
            .into_iter()
            .enumerate()
            .map(|(order, proposal)| {
                self.map_proposal(order, proposal, subtask, registry, scope, &mut diagnostics)
            })
            .collect();
        bind_implicit_targets(&mut calls, earlier.as_deref());

        let kept = calls.iter().filter(|c| !c.is_dropped()).count();
        let status = if kept == 0 {
            warn!(subtask = %subtask.id, "Subtask mapped to zero calls");
            diagnostics.push(
                Diagnostic::new(
                    FailureKind::UnsatisfiableSubtask,
                    StageId::Mapping,
                    format!("'{}' mapped to no registered operation", subtask.goal),
                )
                .for_subtask(&subtask.id),
            );
            SubtaskStatus::Unsatisfied
        } else if kept < calls.len() {
            SubtaskStatus::PartiallySatisfied
        } else {
            SubtaskStatus::Satisfied
        };

        debug!(subtask = %subtask.id, calls = calls.len(), kept, status = %status, "Subtask mapped");
        Ok(MappingOutcome {
            calls,
            diagnostics,
            status,
        })
    }
}

/// Give every mutation without an explicit target the object it most likely
/// means: the nearest creation proposed before it in this subtask, else the
/// first one proposed after it, else the latest target of earlier subtasks.
///
/// Creations are emitted ahead of mutations within a subtask, so either
/// creation exists by the time the mutation runs.
fn bind_implicit_targets(calls: &mut [MappedCall], earlier: Option<&str>) {
    let creation_target = |call: &MappedCall| {
        (call.class == OperationClass::Creation && !call.is_dropped())
            .then(|| call.target.clone())
            .flatten()
    };

    for i in 0..calls.len() {
        if calls[i].class != OperationClass::Mutation || calls[i].target.is_some() {
            continue;
        }
        let bound = calls[..i]
            .iter()
            .rev()
            .find_map(creation_target)
            .or_else(|| calls[i + 1..].iter().find_map(creation_target))
            .or_else(|| earlier.map(str::to_string));
        calls[i].target = bound;
    }
}

/// `name(param: type, ...)` with required parameters marked `!`
fn signature(spec: &OperationSpec) -> String {
    let params: Vec<String> = spec
        .parameters
        .iter()
        .map(|p| {
            let marker = if p.required { "!" } else { "" };
            format!("{}{marker}: {}", p.name, p.param_type)
        })
        .collect();
    format!("{}({})", spec.name, params.join(", "))
}

/// One call guessed from the subtask's nouns: a primitive for a known
/// archetype, else a material for a color word.
fn heuristic_guess(goal: &str) -> Option<Proposal> {
    let color = extract_color(goal).map(|c| json!(c.to_array()));
    if let Some(primitive) = archetype_in(goal) {
        return Some(Proposal {
            operation: Some(primitive.to_string()),
            color,
            ..Proposal::default()
        });
    }
    color.map(|color| Proposal {
        operation: Some(MATERIAL_SLOT_ADD.to_string()),
        color: Some(color),
        ..Proposal::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::QueueOracle;
    use scenesmith_registry::fixtures::blender_registry;
    use scenesmith_stage_api::ColorSpec;

    fn mapper(replies: &[&str]) -> (OracleMapper, Arc<QueueOracle>) {
        let oracle = Arc::new(QueueOracle::new(replies));
        (OracleMapper::new(oracle.clone(), 8, 0.5), oracle)
    }

    async fn map_one(replies: &[&str], goal: &str) -> MappingOutcome {
        let (mapper, _) = mapper(replies);
        let mut scope = TargetScope::new();
        mapper
            .map(&Subtask::new("task_001", goal), &blender_registry(), &mut scope, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_red_sphere() {
        let outcome = map_one(
            &[r#"{"calls": [
                {"operation": "bpy.ops.mesh.primitive_uv_sphere_add", "parameters": {"radius": 1}},
                {"operation": "bpy.ops.object.material_slot_add", "color": "red"}
            ]}"#],
            "create a red sphere",
        )
        .await;

        assert_eq!(outcome.status, SubtaskStatus::Satisfied);
        let [sphere, material] = outcome.calls.as_slice() else {
            panic!("expected two calls, got {:?}", outcome.calls);
        };
        assert_eq!(sphere.class, OperationClass::Creation);
        assert_eq!(sphere.target.as_deref(), Some("Sphere"));
        assert_eq!(sphere.provenance, Provenance::Accepted);
        assert_eq!(material.class, OperationClass::Mutation);
        assert_eq!(material.target.as_deref(), Some("Sphere"));
        assert_eq!(material.color, Some(ColorSpec::rgba(1.0, 0.0, 0.0, 1.0)));
    }

    #[tokio::test]
    async fn test_material_listed_before_its_sphere() {
        let outcome = map_one(
            &[r#"{"calls": [
                {"operation": "bpy.ops.object.material_slot_add", "color": "red"},
                {"operation": "bpy.ops.mesh.primitive_uv_sphere_add"}
            ]}"#],
            "create a red sphere",
        )
        .await;

        let [material, sphere] = outcome.calls.as_slice() else {
            panic!("expected two calls, got {:?}", outcome.calls);
        };
        assert_eq!(sphere.target.as_deref(), Some("Sphere"));
        assert_eq!(material.target.as_deref(), Some("Sphere"));
    }

    #[tokio::test]
    async fn test_implicit_target_prefers_this_subtask() {
        let (mapper, _) = mapper(&[
            r#"[{"op": "add_cube"}]"#,
            r#"[{"op": "object.move", "value": 1}, {"op": "add_sphere"}, {"op": "object.scale", "value": 2}]"#,
            r#"[{"op": "object.rotate", "value": 1.57}]"#,
        ]);
        let registry = blender_registry();
        let mut scope = TargetScope::new();

        mapper
            .map(&Subtask::new("task_001", "a cube"), &registry, &mut scope, None)
            .await
            .unwrap();
        let second = mapper
            .map(&Subtask::new("task_002", "a sphere"), &registry, &mut scope, None)
            .await
            .unwrap();
        let targets: Vec<_> = second.calls.iter().map(|c| c.target.as_deref()).collect();
        assert_eq!(targets, vec![Some("Sphere"), Some("Sphere"), Some("Sphere")]);

        // Nothing created in this subtask: the latest earlier target
        let third = mapper
            .map(&Subtask::new("task_003", "turn it"), &registry, &mut scope, None)
            .await
            .unwrap();
        assert_eq!(third.calls[0].target.as_deref(), Some("Sphere"));
    }

    #[tokio::test]
    async fn test_single_quoted_response_is_repaired() {
        let outcome = map_one(&["\"{'op': 'add_cube'}\""], "add a cube").await;
        assert_eq!(outcome.calls.len(), 1);
        assert_eq!(outcome.calls[0].operation, "bpy.ops.mesh.primitive_cube_add");
        assert_eq!(
            outcome.calls[0].provenance,
            Provenance::Substituted {
                from: "add_cube".to_string()
            }
        );
        assert!(outcome.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_operation_dropped() {
        let outcome = map_one(
            &[r#"[{"op": "add_sphere"}, {"op": "summon_dragon", "target": "Sphere"}]"#],
            "a sphere guarded by a dragon",
        )
        .await;
        assert_eq!(outcome.status, SubtaskStatus::PartiallySatisfied);
        assert!(outcome.calls[1].is_dropped());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, FailureKind::UnknownOperation);
    }

    #[tokio::test]
    async fn test_material_color_from_subtask_text() {
        let outcome = map_one(
            &[r#"[{"op": "add_cube"}, {"op": "object.material_slot_add"}]"#],
            "paint the crate navy",
        )
        .await;
        assert_eq!(outcome.calls[1].color, color::color_for_word("navy"));
        assert_eq!(outcome.calls[0].color, None);
    }

    #[tokio::test]
    async fn test_archetype_parameter() {
        let outcome = map_one(
            &[r#"{"calls": [{"primitive": "mug", "name": "Mug"}, {"shape": "teapot"}]}"#],
            "a mug and a teapot",
        )
        .await;
        assert_eq!(outcome.calls[0].operation, "bpy.ops.mesh.primitive_cylinder_add");
        assert_eq!(outcome.calls[0].target.as_deref(), Some("Mug"));
        // Unmapped archetypes fall back to the generic primitive
        assert_eq!(outcome.calls[1].operation, "bpy.ops.mesh.primitive_cube_add");
        assert_eq!(outcome.calls[1].target.as_deref(), Some("Cube"));
    }

    #[tokio::test]
    async fn test_garbage_falls_back_to_heuristic() {
        let outcome = map_one(&["I'd love to help!"], "a red cricket ball").await;
        assert_eq!(outcome.status, SubtaskStatus::Satisfied);
        assert_eq!(outcome.calls[0].operation, "bpy.ops.mesh.primitive_uv_sphere_add");
        assert_eq!(outcome.calls[0].color, Some(ColorSpec::rgba(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(outcome.diagnostics[0].kind, FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_oracle_failure_without_guess_is_unsatisfied() {
        // QueueOracle with no replies fails every call
        let outcome = map_one(&[], "make it feel cozy").await;
        assert!(outcome.calls.is_empty());
        assert_eq!(outcome.status, SubtaskStatus::Unsatisfied);
        let kinds: Vec<_> = outcome.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![FailureKind::OracleFailure, FailureKind::UnsatisfiableSubtask]);
    }

    #[tokio::test]
    async fn test_targets_across_subtasks() {
        let (mapper, _) = mapper(&[
            r#"[{"op": "add_cube"}]"#,
            r#"[{"op": "add_cube"}]"#,
            r#"[{"op": "object.move", "value": [0, 0, 2]}]"#,
        ]);
        let registry = blender_registry();
        let mut scope = TargetScope::new();
        let mut targets = Vec::new();
        for (i, goal) in ["a cube", "another cube", "lift it"].iter().enumerate() {
            let subtask = Subtask::new(format!("task_{:03}", i + 1), *goal);
            let outcome = mapper.map(&subtask, &registry, &mut scope, None).await.unwrap();
            targets.push(outcome.calls[0].target.clone());
        }
        assert_eq!(
            targets,
            vec![
                Some("Cube".to_string()),
                Some("Cube.001".to_string()),
                Some("Cube.001".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_context_carries_candidates_and_feedback() {
        let (mapper, oracle) = mapper(&[r#"[{"op": "add_sphere"}]"#]);
        let mut scope = TargetScope::new();
        mapper
            .map(
                &Subtask::new("task_001", "a sphere"),
                &blender_registry(),
                &mut scope,
                Some("- step 2: mutation before creation"),
            )
            .await
            .unwrap();

        let (prompt, context) = oracle.calls().remove(0);
        assert!(prompt.contains("Subtask task_001: a sphere"));
        let context = context.unwrap();
        assert!(context.contains("bpy.ops.mesh.primitive_uv_sphere_add(segments: int"));
        assert!(context.contains("mutation before creation"));
    }
}
