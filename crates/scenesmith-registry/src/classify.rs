//! Keyword classification of operations into categories and classes

use std::collections::BTreeSet;

use crate::model::OperationClass;

/// Operator namespaces with their own category
const OPERATOR_PREFIXES: &[(&str, &str)] = &[
    ("bpy.ops.mesh.", "mesh_operators"),
    ("bpy.ops.object.", "object_operators"),
    ("bpy.ops.material.", "material_operators"),
    ("bpy.ops.anim.", "animation_operators"),
    ("bpy.ops.render.", "render_operators"),
    ("bpy.ops.transform.", "transform_operators"),
];

/// Node families under `bpy.types`, matched anywhere in the type name
const NODE_FAMILIES: &[(&str, &str)] = &[
    ("GeometryNode", "geometry_nodes"),
    ("ShaderNode", "shader_nodes"),
    ("CompositorNode", "compositor_nodes"),
    ("FunctionNode", "function_nodes"),
];

/// Name fragments and the tags they contribute
const NAME_TAGS: &[(&str, &[&str])] = &[
    ("mesh", &["mesh", "modeling"]),
    ("object", &["object"]),
    ("transform", &["transform"]),
    ("material", &["material", "shading"]),
    ("render", &["render", "output"]),
    ("anim", &["animation", "keyframe"]),
    ("modifier", &["modifier"]),
];

const CREATION_WORDS: &[&str] = &["create", "creates", "add", "adds", "new", "construct", "constructs"];
const DELETION_WORDS: &[&str] = &["delete", "deletes", "remove", "removes"];
const SELECTION_WORDS: &[&str] = &["select", "selects", "selection"];
const TRANSFORM_WORDS: &[&str] = &[
    "transform", "move", "moves", "rotate", "rotates", "scale", "scales", "translate", "resize",
];

/// Tags that make an operation mutation-class
const MUTATION_TAGS: &[&str] = &["material", "shading", "transform", "modifier", "keyframe"];

/// Primary category of a fully qualified name
#[must_use]
pub fn primary_category(name: &str) -> &'static str {
    if let Some((_, category)) = OPERATOR_PREFIXES
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
    {
        return category;
    }

    if let Some(rest) = name.strip_prefix("bpy.types.") {
        let type_name = rest.split('.').next().unwrap_or(rest);
        if let Some((_, category)) = NODE_FAMILIES
            .iter()
            .find(|(family, _)| type_name.contains(family))
        {
            return category;
        }
        if type_name.ends_with("Modifier") {
            return "modifiers";
        }
        if type_name.ends_with("Constraint") {
            return "constraints";
        }
        return "data_types";
    }

    if name.starts_with("bpy.context") {
        "context"
    } else if name.starts_with("bpy.utils") {
        "utilities"
    } else {
        "other"
    }
}

/// Keyword tags from the name and description, sorted and deduplicated
#[must_use]
pub fn keyword_tags(name: &str, description: &str) -> Vec<String> {
    let mut tags = BTreeSet::new();
    let lower_name = name.to_lowercase();

    for (fragment, fragment_tags) in NAME_TAGS {
        if lower_name.contains(fragment) {
            tags.extend(fragment_tags.iter().copied());
        }
    }

    let leaf = lower_name.rsplit('.').next().unwrap_or(&lower_name);
    if leaf.starts_with("primitive_") || leaf.ends_with("_add") {
        tags.insert("creation");
    }

    let words: BTreeSet<String> = description
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    let mentions = |vocabulary: &[&str]| vocabulary.iter().any(|w| words.contains(*w));

    if mentions(CREATION_WORDS) {
        tags.insert("creation");
    }
    if mentions(DELETION_WORDS) {
        tags.insert("deletion");
    }
    if mentions(SELECTION_WORDS) {
        tags.insert("selection");
    }
    if mentions(TRANSFORM_WORDS) {
        tags.insert("transform");
    }

    tags.into_iter().map(str::to_string).collect()
}

/// Full category list for an operation: primary category, then keyword tags
#[must_use]
pub fn categorize(name: &str, description: &str) -> Vec<String> {
    let mut categories = vec![primary_category(name).to_string()];
    categories.extend(keyword_tags(name, description));
    categories
}

/// Class derived from category tags; mutation tags win over creation.
#[must_use]
pub fn class_of(categories: &[String]) -> OperationClass {
    let has = |tag: &str| categories.iter().any(|c| c == tag);
    if MUTATION_TAGS.iter().any(|t| has(t)) {
        OperationClass::Mutation
    } else if has("creation") {
        OperationClass::Creation
    } else {
        OperationClass::Neutral
    }
}
