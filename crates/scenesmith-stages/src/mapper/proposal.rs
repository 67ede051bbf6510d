//! Proposed calls extracted from repaired oracle JSON

use serde_json::{Map, Value};

const LIST_KEYS: &[&str] = &["calls", "api_calls", "operations"];
const OPERATION_KEYS: &[&str] = &["operation", "op", "api_name", "name"];
const PARAM_KEYS: &[&str] = &["parameters", "params", "args", "arguments"];
const TARGET_KEYS: &[&str] = &["target", "name", "object_name"];
const COLOR_KEYS: &[&str] = &["color", "colour", "rgba", "material_color"];
const ARCHETYPE_KEYS: &[&str] = &["primitive", "shape", "archetype", "object_type"];
/// Bookkeeping fields that are never operation parameters
const IGNORED_KEYS: &[&str] = &["execution_order", "description", "reason", "explanation"];

/// One call as proposed, before registry validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Proposal {
    pub operation: Option<String>,
    pub target: Option<String>,
    pub color: Option<Value>,
    pub archetype: Option<String>,
    pub params: Map<String, Value>,
}

/// Extract proposals in execution order.
///
/// Accepts `{"calls": [...]}` (or `api_calls`/`operations`), a bare array, or
/// a single call object. An `execution_order` field, when present, reorders
/// calls; calls without one keep their position.
#[must_use]
pub fn extract(value: &Value) -> Vec<Proposal> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match LIST_KEYS.iter().find_map(|k| map.get(*k)) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(_) => Vec::new(),
            None if is_call(map) => vec![value],
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut keyed: Vec<(f64, Proposal)> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            #[allow(clippy::cast_precision_loss)]
            let position = (index + 1) as f64;
            let order = item
                .get("execution_order")
                .and_then(Value::as_f64)
                .unwrap_or(position);
            proposal(item).map(|p| (order, p))
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, p)| p).collect()
}

fn is_call(map: &Map<String, Value>) -> bool {
    OPERATION_KEYS
        .iter()
        .chain(ARCHETYPE_KEYS)
        .any(|k| map.contains_key(*k))
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn proposal(item: &Value) -> Option<Proposal> {
    let map = match item {
        Value::String(_) => {
            return Some(Proposal {
                operation: text(item),
                ..Proposal::default()
            });
        }
        Value::Object(map) => map,
        _ => return None,
    };

    // Beside an archetype, `name` names the object rather than the operation
    let has_archetype = ARCHETYPE_KEYS.iter().any(|k| map.contains_key(*k));
    let operation_key = OPERATION_KEYS
        .iter()
        .filter(|k| !(has_archetype && **k == "name"))
        .find(|k| map.get(**k).and_then(text).is_some())
        .copied();
    let operation = operation_key.and_then(|k| map.get(k)).and_then(text);

    let target = TARGET_KEYS
        .iter()
        .filter(|k| Some(**k) != operation_key)
        .find_map(|k| map.get(*k).and_then(text));
    let color = COLOR_KEYS.iter().find_map(|k| map.get(*k)).cloned();
    let archetype = ARCHETYPE_KEYS.iter().find_map(|k| map.get(*k).and_then(text));

    let mut params = Map::new();
    for (key, value) in map {
        let reserved = OPERATION_KEYS
            .iter()
            .chain(PARAM_KEYS)
            .chain(TARGET_KEYS)
            .chain(COLOR_KEYS)
            .chain(ARCHETYPE_KEYS)
            .chain(IGNORED_KEYS)
            .any(|k| *k == key.as_str());
        if !reserved {
            params.insert(key.clone(), value.clone());
        }
    }
    if let Some(Value::Object(nested)) = PARAM_KEYS.iter().find_map(|k| map.get(*k)) {
        for (key, value) in nested {
            params.insert(key.clone(), value.clone());
        }
    }

    let color = color.or_else(|| params.remove("color"));

    if operation.is_none() && archetype.is_none() {
        return None;
    }

    Some(Proposal {
        operation,
        target,
        color,
        archetype,
        params,
    })
}
