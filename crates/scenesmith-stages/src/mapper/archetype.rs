//! Everyday objects to primitive shapes

/// The most generic primitive, used for archetypes with no entry
pub const GENERIC_PRIMITIVE: &str = "bpy.ops.mesh.primitive_cube_add";

const SPHERE: &str = "bpy.ops.mesh.primitive_uv_sphere_add";
const CUBE: &str = GENERIC_PRIMITIVE;
const CYLINDER: &str = "bpy.ops.mesh.primitive_cylinder_add";
const CONE: &str = "bpy.ops.mesh.primitive_cone_add";
const PLANE: &str = "bpy.ops.mesh.primitive_plane_add";
const TORUS: &str = "bpy.ops.mesh.primitive_torus_add";
const MONKEY: &str = "bpy.ops.mesh.primitive_monkey_add";

const ARCHETYPES: &[(&str, &str)] = &[
    ("sphere", SPHERE),
    ("ball", SPHERE),
    ("orb", SPHERE),
    ("globe", SPHERE),
    ("planet", SPHERE),
    ("head", SPHERE),
    ("cube", CUBE),
    ("box", CUBE),
    ("crate", CUBE),
    ("block", CUBE),
    ("dice", CUBE),
    ("chair", CUBE),
    ("table", CUBE),
    ("desk", CUBE),
    ("cylinder", CYLINDER),
    ("mug", CYLINDER),
    ("cup", CYLINDER),
    ("pipe", CYLINDER),
    ("tube", CYLINDER),
    ("pillar", CYLINDER),
    ("column", CYLINDER),
    ("cone", CONE),
    ("funnel", CONE),
    ("pyramid", CONE),
    ("plane", PLANE),
    ("floor", PLANE),
    ("ground", PLANE),
    ("torus", TORUS),
    ("donut", TORUS),
    ("ring", TORUS),
    ("monkey", MONKEY),
    ("suzanne", MONKEY),
];

/// Object names the application gives new primitives
const DEFAULT_NAMES: &[(&str, &str)] = &[
    ("primitive_uv_sphere_add", "Sphere"),
    ("primitive_ico_sphere_add", "Icosphere"),
    ("primitive_cube_add", "Cube"),
    ("primitive_cylinder_add", "Cylinder"),
    ("primitive_cone_add", "Cone"),
    ("primitive_plane_add", "Plane"),
    ("primitive_circle_add", "Circle"),
    ("primitive_grid_add", "Grid"),
    ("primitive_torus_add", "Torus"),
    ("primitive_monkey_add", "Suzanne"),
];

/// Primitive for one archetype word; a trailing plural `s` is ignored
#[must_use]
pub fn primitive_for(word: &str) -> Option<&'static str> {
    let word = word.trim().to_lowercase();
    let lookup = |w: &str| {
        ARCHETYPES
            .iter()
            .find(|(archetype, _)| *archetype == w)
            .map(|(_, primitive)| *primitive)
    };
    lookup(word.as_str()).or_else(|| word.strip_suffix('s').and_then(lookup))
}

/// Primitive for an archetype value, falling back to the generic primitive
#[must_use]
pub fn primitive_or_generic(phrase: &str) -> &'static str {
    archetype_in(phrase).unwrap_or(GENERIC_PRIMITIVE)
}

/// First archetype word in `text`
#[must_use]
pub fn archetype_in(text: &str) -> Option<&'static str> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .find_map(primitive_for)
}

/// Base object name for a creation operation: the application's default for
/// known primitives, else the operation's leaf in title case.
#[must_use]
pub fn default_object_name(operation: &str) -> String {
    let leaf = operation.rsplit('.').next().unwrap_or(operation);
    if let Some((_, name)) = DEFAULT_NAMES.iter().find(|(op, _)| *op == leaf) {
        return (*name).to_string();
    }

    let core = leaf.trim_start_matches("primitive_").trim_end_matches("_add");
    let name: String = core
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect();
    if name.is_empty() { "Object".to_string() } else { name }
}
