//! Instructions sent to the oracle

pub(crate) const PLAN_INSTRUCTIONS: &str = "Break the request below into the smallest set of \
subtasks, one per distinct object or action.

Respond with one JSON object of the form
{\"subtasks\": [{\"id\": \"task_001\", \"goal\": \"create a red sphere\", \"depends_on\": []}]}

A subtask that changes an object created by another subtask lists that subtask's id in \
depends_on. Do not describe the answer; the object is the whole answer.";

pub(crate) const PLAN_CLARIFICATION: &str = "Your previous answer could not be read. Reply with \
exactly one JSON object holding a \"subtasks\" array, using double quotes, and nothing else.";

pub(crate) const MAP_INSTRUCTIONS: &str = "Map the subtask below to Blender operations chosen \
from the candidate operations in the context.

Respond with one JSON object of the form
{\"calls\": [{\"operation\": \"bpy.ops.mesh.primitive_cube_add\", \"target\": \"Crate\", \
\"parameters\": {\"size\": 1.0}, \"color\": \"red\"}]}

Rules:
1. Use only operations and parameter names from the candidate list
2. Put the call that creates an object before any call that changes it
3. Give colors as a color word or as RGBA numbers between 0 and 1
4. A call that changes an object names it in \"target\"";
