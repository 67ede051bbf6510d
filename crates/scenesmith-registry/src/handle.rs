//! Shared handle to the active registry snapshot
//!
//! Readers clone an `Arc<Registry>` and keep querying it without holding any
//! lock. A rebuild swaps in a whole new snapshot; runs that already hold the
//! old one finish against it.

use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct RegistryHandle {
    active: Arc<RwLock<Arc<Registry>>>,
}

impl RegistryHandle {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            active: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// The current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<Registry> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the active snapshot, returning the previous one.
    pub fn swap(&self, registry: Registry) -> Arc<Registry> {
        let next = Arc::new(registry);
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        info!(
            previous_version = %guard.version(),
            version = %next.version(),
            operations = next.len(),
            "Swapping active registry snapshot"
        );
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{op, sample_registry};
    use chrono::Utc;

    #[test]
    fn test_swap_leaves_held_snapshot_untouched() {
        let handle = RegistryHandle::new(sample_registry());
        let held = handle.snapshot();

        let replacement = Registry::from_operations(
            vec![op("bpy.ops.mesh.primitive_cone_add", "Construct a cone mesh", &[])],
            Utc::now(),
        );
        let previous = handle.swap(replacement);

        assert_eq!(held.len(), 5);
        assert!(Arc::ptr_eq(&held, &previous));
        assert_eq!(handle.snapshot().len(), 1);
        assert!(handle.snapshot().contains("bpy.ops.mesh.primitive_cone_add"));
    }

    #[test]
    fn test_concurrent_readers() {
        let handle = RegistryHandle::new(sample_registry());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                std::thread::spawn(move || handle.snapshot().search("mesh", 0).len())
            })
            .collect();
        for t in threads {
            assert_eq!(t.join().unwrap(), 3);
        }
    }
}
