//! On-disk registry document
//!
//! Shape: `{version, built_at, operations: {name: OperationSpec}, categories:
//! {category: [name]}}`, written as JCS-canonical JSON through an atomic
//! rename.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use scenesmith_utils::atomic_write::write_file_atomic;
use scenesmith_utils::canonicalization::emit_jcs;
use scenesmith_utils::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::model::OperationSpec;
use crate::registry::Registry;

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    version: String,
    built_at: DateTime<Utc>,
    operations: BTreeMap<String, OperationSpec>,
    categories: BTreeMap<String, Vec<String>>,
}

/// Persist a registry snapshot.
///
/// # Errors
///
/// Returns `RegistryError::PersistFailed` if serialization or the write fails.
pub fn save(registry: &Registry, path: &Utf8Path) -> Result<(), RegistryError> {
    let persist_failed = |e: anyhow::Error| RegistryError::PersistFailed {
        path: path.to_string(),
        reason: format!("{e:#}"),
    };

    let document = RegistryDocument {
        version: registry.version().to_string(),
        built_at: registry.built_at(),
        operations: registry.operations().clone(),
        categories: registry.category_index().clone(),
    };

    let json = emit_jcs(&document).map_err(persist_failed)?;
    write_file_atomic(path, &json).map_err(persist_failed)?;

    debug!(path = %path, operations = registry.len(), "Registry persisted");
    Ok(())
}

/// Load a persisted registry snapshot.
///
/// The category index is rebuilt from the operations rather than trusted.
///
/// # Errors
///
/// Returns `RegistryError::ReadFailed` if the file cannot be read and
/// `RegistryError::Malformed` if it is not a registry document.
pub fn load(path: &Utf8Path) -> Result<Registry, RegistryError> {
    let content = std::fs::read_to_string(path).map_err(|e| RegistryError::ReadFailed {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let document: RegistryDocument =
        serde_json::from_str(&content).map_err(|e| RegistryError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    if let Some((key, op)) = document.operations.iter().find(|(key, op)| **key != op.name) {
        return Err(RegistryError::Malformed {
            path: path.to_string(),
            reason: format!("entry '{key}' holds operation '{}'", op.name),
        });
    }

    let registry = Registry::from_operations(document.operations.into_values(), document.built_at);

    if registry.version() != document.version {
        warn!(
            path = %path,
            stored = %document.version,
            computed = %registry.version(),
            "Registry version does not match its contents"
        );
    }

    Ok(registry)
}
