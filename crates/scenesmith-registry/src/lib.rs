//! Operation registry for scenesmith
//!
//! Builds a catalog of valid operations from the application's HTML API
//! reference, answers lookup/search/parameter queries against an immutable
//! snapshot, and persists snapshots as canonical JSON.

mod builder;
pub mod classify;
mod handle;
mod model;
mod parse;
pub mod persist;
mod registry;

pub use builder::{BuildReport, RegistryBuilder, SkippedPage};
pub use handle::RegistryHandle;
pub use model::{OperationClass, OperationSpec, ParamSpec, ParamType};
pub use registry::{Registry, RegistryStats, SearchHit, search_terms};
pub use scenesmith_utils::error::RegistryError;

/// Test fixtures shared with dependent crates
#[doc(hidden)]
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::classify::categorize;
    use crate::model::{OperationSpec, ParamSpec, ParamType};
    use crate::registry::Registry;

    fn param(name: &str, param_type: ParamType, required: bool) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            param_type,
            required,
            default: None,
            constraints: None,
            enum_values: None,
        }
    }

    fn spec(name: &str, description: &str, parameters: Vec<ParamSpec>) -> OperationSpec {
        OperationSpec {
            name: name.to_string(),
            parameters,
            description: description.to_string(),
            categories: categorize(name, description),
        }
    }

    /// A small Blender-like catalog: primitives, transforms and materials
    #[must_use]
    pub fn blender_registry() -> Registry {
        use ParamType::{Array, Boolean, Float, Int};

        Registry::from_operations(
            vec![
                spec(
                    "bpy.ops.mesh.primitive_uv_sphere_add",
                    "Construct a UV sphere mesh",
                    vec![
                        param("segments", Int, false),
                        param("ring_count", Int, false),
                        param("radius", Float, false),
                        param("location", Array, false),
                    ],
                ),
                spec(
                    "bpy.ops.mesh.primitive_cube_add",
                    "Construct a cube mesh",
                    vec![param("size", Float, false), param("location", Array, false)],
                ),
                spec(
                    "bpy.ops.mesh.primitive_cylinder_add",
                    "Construct a cylinder mesh",
                    vec![
                        param("vertices", Int, false),
                        param("radius", Float, false),
                        param("depth", Float, false),
                        param("location", Array, false),
                    ],
                ),
                spec(
                    "bpy.ops.mesh.primitive_cone_add",
                    "Construct a conic mesh",
                    vec![
                        param("vertices", Int, false),
                        param("radius1", Float, false),
                        param("depth", Float, false),
                        param("location", Array, false),
                    ],
                ),
                spec(
                    "bpy.ops.mesh.primitive_plane_add",
                    "Construct a filled planar mesh with 4 vertices",
                    vec![param("size", Float, false), param("location", Array, false)],
                ),
                spec(
                    "bpy.ops.transform.translate",
                    "Move selected items",
                    vec![param("value", Array, true)],
                ),
                spec(
                    "bpy.ops.transform.resize",
                    "Scale (resize) selected items",
                    vec![param("value", Array, true)],
                ),
                spec(
                    "bpy.ops.transform.rotate",
                    "Rotate selected items",
                    vec![param("value", Float, true), param("orient_axis", ParamType::String, false)],
                ),
                spec(
                    "bpy.ops.object.material_slot_add",
                    "Add a new material slot",
                    vec![],
                ),
                spec(
                    "bpy.ops.object.shade_smooth",
                    "Render and display faces smooth, using interpolated vertex normals",
                    vec![],
                ),
                spec(
                    "bpy.ops.object.delete",
                    "Delete selected objects",
                    vec![param("use_global", Boolean, false)],
                ),
            ],
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }
}
