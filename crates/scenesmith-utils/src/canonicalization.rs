use anyhow::{Context, Result};
use serde::Serialize;

/// Emit a value as JCS-canonical JSON (RFC 8785).
///
/// Used for every persisted JSON document so identical content always yields
/// identical bytes regardless of map iteration or field order.
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String> {
    let json_value =
        serde_json::to_value(value).with_context(|| "Failed to serialize value to JSON")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize JSON using JCS")?;
    String::from_utf8(json_bytes).with_context(|| "JCS output contained invalid UTF-8")
}

/// BLAKE3 hex digest of the canonical JSON form of `value`
pub fn content_hash<T: Serialize>(value: &T) -> Result<String> {
    let canonical = emit_jcs(value)?;
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_emit_jcs_sorts_keys() {
        let mut map = HashMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        assert_eq!(emit_jcs(&map).unwrap(), r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_content_hash_ignores_insertion_order() {
        let a: HashMap<&str, i32> = [("x", 1), ("y", 2)].into_iter().collect();
        let b: HashMap<&str, i32> = [("y", 2), ("x", 1)].into_iter().collect();
        let ha = content_hash(&a).unwrap();
        assert_eq!(ha, content_hash(&b).unwrap());
        assert_eq!(ha.len(), 64);
    }
}
