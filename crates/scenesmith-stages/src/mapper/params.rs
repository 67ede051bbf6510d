//! Parameter cleaning for proposed calls

use scenesmith_registry::{OperationClass, OperationSpec, ParamType};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Fragments of operator class names that models leak into parameter keys
const OPERATOR_CLASS_FRAGMENTS: &[&str] = &["OBJECT_OT_", "TRANSFORM_OT_", "MESH_OT_", "VIEW3D_OT_"];

const VECTOR_KEYS: &[&str] = &["location", "rotation", "scale", "value"];
const FLOAT_KEYS: &[&str] = &["radius", "radius1", "radius2", "size", "depth"];
const INT_KEYS: &[&str] = &["segments", "ring_count", "vertices"];

/// Values filled in for a creation primitive's missing required parameters
const SAFE_DEFAULTS: &[(&str, fn() -> Value)] = &[
    ("radius", || json!(1.0)),
    ("size", || json!(2.0)),
    ("depth", || json!(2.0)),
    ("location", || json!([0.0, 0.0, 0.0])),
    ("segments", || json!(32)),
    ("ring_count", || json!(16)),
    ("vertices", || json!(32)),
];

#[derive(Clone, Copy)]
enum Coercion {
    Vector,
    Float,
    Int,
    Boolean,
    Keep,
}

fn coercion_for(key: &str, spec: &OperationSpec) -> Coercion {
    if let Some(param) = spec.param(key) {
        return match param.param_type {
            ParamType::Array => Coercion::Vector,
            ParamType::Float => Coercion::Float,
            ParamType::Int => Coercion::Int,
            ParamType::Boolean => Coercion::Boolean,
            _ => Coercion::Keep,
        };
    }
    if VECTOR_KEYS.contains(&key) {
        Coercion::Vector
    } else if FLOAT_KEYS.contains(&key) {
        Coercion::Float
    } else if INT_KEYS.contains(&key) {
        Coercion::Int
    } else {
        Coercion::Keep
    }
}

/// Clean raw proposal parameters against an operation's declared types.
///
/// Leaked operator keys are removed; values that cannot be coerced are kept
/// as proposed.
#[must_use]
pub fn clean_params(raw: &Map<String, Value>, spec: &OperationSpec) -> BTreeMap<String, Value> {
    raw.iter()
        .filter(|(key, _)| !OPERATOR_CLASS_FRAGMENTS.iter().any(|f| key.contains(f)))
        .map(|(key, value)| {
            let coerced = match coercion_for(key, spec) {
                Coercion::Vector => to_vec3(value),
                Coercion::Float => to_float(value),
                Coercion::Int => to_int(value),
                Coercion::Boolean => to_bool(value),
                Coercion::Keep => None,
            };
            (key.clone(), coerced.unwrap_or_else(|| value.clone()))
        })
        .collect()
}

/// Fill missing required parameters of a creation primitive.
pub fn apply_safe_defaults(params: &mut BTreeMap<String, Value>, spec: &OperationSpec) {
    if spec.class() != OperationClass::Creation {
        return;
    }
    for param in spec.required_params() {
        if params.contains_key(&param.name) {
            continue;
        }
        if let Some((_, default)) = SAFE_DEFAULTS.iter().find(|(name, _)| *name == param.name) {
            params.insert(param.name.clone(), default());
        }
    }
}

fn numbers_in(text: &str) -> Vec<f64> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == 'e' || c == 'E'))
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse().ok())
        .collect()
}

fn to_vec3(value: &Value) -> Option<Value> {
    let numbers: Vec<f64> = match value {
        Value::Number(n) => vec![n.as_f64()?],
        Value::Array(items) => items.iter().map(Value::as_f64).collect::<Option<_>>()?,
        Value::String(text) => numbers_in(text),
        _ => return None,
    };
    match numbers.as_slice() {
        [n] => Some(json!([n, n, n])),
        [x, y] => Some(json!([x, y, 0.0])),
        [x, y, z, ..] => Some(json!([x, y, z])),
        [] => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| json!(f)),
        Value::String(text) => text.trim().parse::<f64>().ok().map(|f| json!(f)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(value: &Value) -> Option<Value> {
    let float = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    float.is_finite().then(|| json!(float.round() as i64))
}

fn to_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(json!(true)),
            "false" | "no" | "0" => Some(json!(false)),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|f| json!(f != 0.0)),
        _ => None,
    }
}
