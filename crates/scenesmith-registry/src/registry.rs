//! The immutable registry snapshot and its query surface
//!
//! A [`Registry`] is built once and never mutated; every query takes `&self`
//! so one snapshot can be shared across concurrent runs without locking.

use chrono::{DateTime, Utc};
use scenesmith_utils::canonicalization::content_hash;
use scenesmith_utils::error::RegistryError;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::model::{OperationSpec, ParamSpec};

/// Words that never count as search terms
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "or", "of", "to", "in", "on", "at", "for", "with", "from", "by",
        "it", "its", "is", "be", "this", "that", "into", "onto", "some", "make", "please", "bpy",
        "ops",
    ]
    .into_iter()
    .collect()
});

/// Split a query into lowercase search terms.
///
/// Terms shorter than two characters and stopwords are dropped; duplicates
/// are removed keeping first occurrence.
#[must_use]
pub fn search_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(*t))
        .filter(|t| seen.insert((*t).to_string()))
        .map(str::to_string)
        .collect()
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub name: String,
    /// Name hits plus description hits over all terms
    pub score: usize,
    /// Distinct query terms found in the name or description
    pub matched_terms: usize,
}

/// Summary counts over a registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
    pub modules: BTreeMap<String, usize>,
    pub parameter_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    operations: BTreeMap<String, OperationSpec>,
    category_index: BTreeMap<String, Vec<String>>,
    version: String,
    built_at: DateTime<Utc>,
}

impl Registry {
    /// Build a snapshot from operations in corpus order; a later entry with
    /// the same name replaces an earlier one.
    #[must_use]
    pub fn from_operations<I>(operations: I, built_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = OperationSpec>,
    {
        let mut table = BTreeMap::new();
        for op in operations {
            table.insert(op.name.clone(), op);
        }

        let mut category_index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for op in table.values() {
            for category in &op.categories {
                category_index
                    .entry(category.clone())
                    .or_default()
                    .push(op.name.clone());
            }
        }

        // Serializing plain data cannot fail
        let version = content_hash(&table).unwrap_or_default();

        Self {
            operations: table,
            category_index,
            version,
            built_at,
        }
    }

    /// Exact lookup by fully qualified name.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` when no operation has that name.
    pub fn lookup(&self, name: &str) -> Result<&OperationSpec, RegistryError> {
        self.operations
            .get(name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Operation names tagged with `category`, in name order
    #[must_use]
    pub fn by_category(&self, category: &str) -> &[String] {
        self.category_index
            .get(category)
            .map_or(&[], Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.category_index.keys().map(String::as_str)
    }

    #[must_use]
    pub fn category_index(&self) -> &BTreeMap<String, Vec<String>> {
        &self.category_index
    }

    /// Parameter shape of an operation.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` when no operation has that name.
    pub fn params(&self, name: &str) -> Result<&[ParamSpec], RegistryError> {
        self.lookup(name).map(|op| op.parameters.as_slice())
    }

    /// Keyword search over name and description.
    ///
    /// Ranked by descending score, ties broken by ascending name. `limit` of
    /// zero means unlimited.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.search_in(query, None, limit)
    }

    /// Like [`Registry::search`], restricted to one category.
    #[must_use]
    pub fn search_in(&self, query: &str, category: Option<&str>, limit: usize) -> Vec<SearchHit> {
        let terms = search_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let candidates: Box<dyn Iterator<Item = &OperationSpec>> = match category {
            Some(c) => Box::new(self.by_category(c).iter().filter_map(|n| self.operations.get(n))),
            None => Box::new(self.operations.values()),
        };

        let mut hits: Vec<SearchHit> = candidates
            .filter_map(|op| {
                let name = op.name.to_lowercase();
                let description = op.description.to_lowercase();
                let mut score = 0;
                let mut matched_terms = 0;
                for term in &terms {
                    let in_name = name.contains(term.as_str());
                    let in_description = description.contains(term.as_str());
                    score += usize::from(in_name) + usize::from(in_description);
                    matched_terms += usize::from(in_name || in_description);
                }
                (score > 0).then(|| SearchHit {
                    name: op.name.clone(),
                    score,
                    matched_terms,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.values()
    }

    #[must_use]
    pub fn operations(&self) -> &BTreeMap<String, OperationSpec> {
        &self.operations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// BLAKE3 fingerprint of the operation table
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total: self.operations.len(),
            ..RegistryStats::default()
        };
        for op in self.operations.values() {
            *stats
                .categories
                .entry(op.primary_category().to_string())
                .or_default() += 1;
            *stats.modules.entry(op.module().to_string()).or_default() += 1;
            for param in &op.parameters {
                *stats
                    .parameter_types
                    .entry(param.param_type.as_str().to_string())
                    .or_default() += 1;
            }
        }
        stats
    }
}
