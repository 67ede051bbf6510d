//! Python rendering of linearized steps

use scenesmith_registry::{OperationClass, OperationSpec};
use scenesmith_stage_api::{ColorSpec, MappedCall};
use serde_json::Value;
use std::fmt::Write as _;

const PRELUDE: &str = r#"import bpy


def scenesmith_object(name):
    if name is None:
        return bpy.context.view_layer.objects.active
    return bpy.data.objects.get(name)


def scenesmith_select(obj):
    bpy.ops.object.select_all(action='DESELECT')
    obj.select_set(True)
    bpy.context.view_layer.objects.active = obj


def scenesmith_apply_color(obj, rgba):
    if obj.data is None or not hasattr(obj.data, "materials"):
        return
    mat = bpy.data.materials.new(name=obj.name + "_material")
    mat.diffuse_color = rgba
    if obj.data.materials:
        obj.data.materials[0] = mat
    else:
        obj.data.materials.append(mat)
"#;

fn py_float(value: f64) -> String {
    if value.is_finite() {
        format!("{value:?}")
    } else {
        "0.0".to_string()
    }
}

/// Double-quoted Python string literal
pub(crate) fn py_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Python literal for a JSON value. Arrays become tuples.
pub(crate) fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => py_float(f),
            (None, None) => n.to_string(),
        },
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(py_literal).collect();
            match inner.len() {
                1 => format!("({},)", inner[0]),
                _ => format!("({})", inner.join(", ")),
            }
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Text safe inside a `#` comment: control characters become spaces
fn comment_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn py_color(color: ColorSpec) -> String {
    let channels: Vec<String> = color.to_array().into_iter().map(py_float).collect();
    format!("({})", channels.join(", "))
}

/// `bpy.ops.x.y(a=1, b=(0.0, 0.0, 0.0))` with declared parameters only
fn invocation(call: &MappedCall, spec: &OperationSpec) -> String {
    let args: Vec<String> = call
        .params
        .iter()
        .filter(|(name, _)| spec.param(name).is_some())
        .map(|(name, value)| format!("{name}={}", py_literal(value)))
        .collect();
    format!("{}({})", spec.name, args.join(", "))
}

/// Renders steps into one self-contained script.
pub(crate) struct ScriptWriter {
    script: String,
}

impl ScriptWriter {
    pub(crate) fn new() -> Self {
        Self {
            script: PRELUDE.to_string(),
        }
    }

    fn line(&mut self, indent: usize, text: &str) {
        let _ = writeln!(self.script, "{:width$}{text}", "", width = indent * 4);
    }

    fn header(&mut self, call: &MappedCall) {
        self.script.push('\n');
        let _ = writeln!(
            self.script,
            "# {}: {}",
            comment_text(&call.subtask_id),
            comment_text(&call.operation)
        );
    }

    pub(crate) fn call(&mut self, call: &MappedCall, spec: &OperationSpec, guarded: bool) {
        self.header(call);
        match call.class {
            OperationClass::Creation => {
                self.line(0, &invocation(call, spec));
                self.line(0, "obj = bpy.context.active_object");
                if call.target.is_some() || call.color.is_some() {
                    self.line(0, "if obj is not None:");
                    if let Some(target) = &call.target {
                        self.line(1, &format!("obj.name = {}", py_str(target)));
                    }
                    if let Some(color) = call.color {
                        self.line(1, &format!("scenesmith_apply_color(obj, {})", py_color(color)));
                    }
                }
            }
            OperationClass::Mutation | OperationClass::Neutral if guarded => {
                let lookup = call.target.as_deref().map_or_else(|| "None".to_string(), py_str);
                let described = call.target.as_deref().unwrap_or("active object");
                self.line(0, &format!("obj = scenesmith_object({lookup})"));
                self.line(0, "if obj is None:");
                self.line(
                    1,
                    &format!(
                        "print({})",
                        py_str(&format!("skip {}: {described} not found", spec.name))
                    ),
                );
                self.line(0, "else:");
                self.line(1, "scenesmith_select(obj)");
                self.line(1, &invocation(call, spec));
                if let Some(color) = call.color {
                    self.line(1, &format!("scenesmith_apply_color(obj, {})", py_color(color)));
                }
            }
            OperationClass::Mutation | OperationClass::Neutral => {
                if let Some(target) = &call.target {
                    self.line(0, &format!("obj = scenesmith_object({})", py_str(target)));
                    self.line(0, "if obj is not None:");
                    self.line(1, "scenesmith_select(obj)");
                }
                self.line(0, &invocation(call, spec));
            }
        }
    }

    pub(crate) fn finish(self) -> String {
        self.script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literals() {
        assert_eq!(py_literal(&json!(null)), "None");
        assert_eq!(py_literal(&json!(true)), "True");
        assert_eq!(py_literal(&json!(2)), "2");
        assert_eq!(py_literal(&json!(1.0)), "1.0");
        assert_eq!(py_literal(&json!([0.0, 0.0, 1.5])), "(0.0, 0.0, 1.5)");
        assert_eq!(py_literal(&json!(["X"])), "(\"X\",)");
        assert_eq!(py_literal(&json!({"a": false})), "{\"a\": False}");
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(py_str("say \"hi\"\n"), r#""say \"hi\"\n""#);
        assert_eq!(py_str(r"C:\tmp"), r#""C:\\tmp""#);
    }

    #[test]
    fn test_comment_stays_on_one_line() {
        assert_eq!(
            comment_text("t1\n__import__('os').remove('x')\r\n#"),
            "t1 __import__('os').remove('x')  #"
        );
        assert_eq!(comment_text("task_001"), "task_001");
    }

    #[test]
    fn test_color_tuple() {
        assert_eq!(py_color(ColorSpec::rgba(1.0, 0.0, 0.0, 1.0)), "(1.0, 0.0, 0.0, 1.0)");
    }
}
