//! Object names claimed during one mapping pass

use std::collections::BTreeSet;

/// Target identifiers created so far in a run.
///
/// Default names are made unique the way the application does it (`Cube`,
/// `Cube.001`, `Cube.002`); explicit names are recorded verbatim so that a
/// duplicate stays visible to validation.
#[derive(Debug, Clone, Default)]
pub struct TargetScope {
    created: BTreeSet<String>,
    latest: Option<String>,
}

impl TargetScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a unique name derived from `base`.
    pub fn claim_default(&mut self, base: &str) -> String {
        let name = if self.created.contains(base) {
            (1..)
                .map(|n| format!("{base}.{n:03}"))
                .find(|candidate| !self.created.contains(candidate))
                .unwrap_or_else(|| base.to_string())
        } else {
            base.to_string()
        };
        self.record(name.clone());
        name
    }

    /// Record an explicitly named creation.
    pub fn claim_explicit(&mut self, name: &str) -> String {
        self.record(name.to_string());
        name.to_string()
    }

    fn record(&mut self, name: String) {
        self.latest = Some(name.clone());
        self.created.insert(name);
    }

    /// Most recent creation target
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.created.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names_are_unique() {
        let mut scope = TargetScope::new();
        assert_eq!(scope.claim_default("Cube"), "Cube");
        assert_eq!(scope.claim_default("Cube"), "Cube.001");
        assert_eq!(scope.claim_default("Sphere"), "Sphere");
        assert_eq!(scope.claim_default("Cube"), "Cube.002");
        assert_eq!(scope.latest(), Some("Cube.002"));
    }

    #[test]
    fn test_explicit_names_are_verbatim() {
        let mut scope = TargetScope::new();
        assert_eq!(scope.claim_explicit("Ball"), "Ball");
        assert_eq!(scope.claim_explicit("Ball"), "Ball");
        assert_eq!(scope.claim_default("Ball"), "Ball.001");
        assert!(scope.contains("Ball"));
        assert!(!scope.contains("Mug"));
    }
}
