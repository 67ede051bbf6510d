//! Proposed operation names to registered operations

use scenesmith_registry::{Registry, search_terms};

/// Shorthand models commonly use, keyed without the `bpy.ops.` prefix
const ALIASES: &[(&str, &str)] = &[
    ("add_sphere", "bpy.ops.mesh.primitive_uv_sphere_add"),
    ("add_cube", "bpy.ops.mesh.primitive_cube_add"),
    ("add_cylinder", "bpy.ops.mesh.primitive_cylinder_add"),
    ("add_cone", "bpy.ops.mesh.primitive_cone_add"),
    ("add_plane", "bpy.ops.mesh.primitive_plane_add"),
    ("object.move", "bpy.ops.transform.translate"),
    ("object.scale", "bpy.ops.transform.resize"),
    ("object.rotate", "bpy.ops.transform.rotate"),
];

/// Terms too common in operation names to identify one
const GENERIC_TERMS: &[&str] = &["add", "create", "new", "make", "mesh", "primitive", "object", "set"];

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Registered as written, possibly after adding the `bpy.ops.` prefix
    Exact(String),
    Alias(String),
    Nearest { name: String, similarity: f64 },
    /// Nothing close enough; carries the best candidate when there was one
    Unknown { best: Option<(String, f64)> },
}

/// Trimmed name without call parentheses
fn normalize(raw: &str) -> &str {
    let name = raw.trim();
    name.strip_suffix("()").unwrap_or(name).trim()
}

/// Resolve `raw` against `registry`, substituting the nearest match when its
/// similarity reaches `floor`.
#[must_use]
pub fn resolve(raw: &str, registry: &Registry, floor: f64) -> Resolution {
    let name = normalize(raw);
    let bare = name.strip_prefix("bpy.ops.").unwrap_or(name);

    let qualified = if name.starts_with("bpy.") {
        name.to_string()
    } else {
        format!("bpy.ops.{name}")
    };
    if registry.contains(&qualified) {
        return Resolution::Exact(qualified);
    }

    let lower = bare.to_lowercase();
    if let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == lower)
        && registry.contains(target)
    {
        return Resolution::Alias((*target).to_string());
    }

    nearest(bare, registry, floor)
}

/// Search hit matching the most distinctive query terms, scored by the share
/// it matches. Ties keep search rank.
fn nearest(bare: &str, registry: &Registry, floor: f64) -> Resolution {
    let terms = search_terms(bare);
    let distinctive: Vec<String> = terms
        .iter()
        .filter(|t| !GENERIC_TERMS.contains(&t.as_str()))
        .cloned()
        .collect();
    let terms = if distinctive.is_empty() { terms } else { distinctive };
    if terms.is_empty() {
        return Resolution::Unknown { best: None };
    }

    let hits = registry.search(&terms.join(" "), 0);
    let Some(hit) = hits
        .into_iter()
        .reduce(|best, hit| if hit.matched_terms > best.matched_terms { hit } else { best })
    else {
        return Resolution::Unknown { best: None };
    };

    #[allow(clippy::cast_precision_loss)]
    let similarity = hit.matched_terms as f64 / terms.len() as f64;
    if similarity >= floor {
        Resolution::Nearest {
            name: hit.name,
            similarity,
        }
    } else {
        Resolution::Unknown {
            best: Some((hit.name, similarity)),
        }
    }
}
