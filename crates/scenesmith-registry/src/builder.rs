//! Registry builder: documentation corpus in, immutable [`Registry`] out
//!
//! Pages are processed in file-name order so that "last seen wins" is
//! deterministic. Malformed pages are skipped and logged; only an unreadable
//! or empty corpus directory fails the build.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use scenesmith_utils::error::RegistryError;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::model::OperationSpec;
use crate::parse::parse_page;
use crate::registry::{Registry, RegistryStats};

/// A page that contributed no operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPage {
    pub file: String,
    pub reason: String,
}

/// Observable summary of one build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub pages_seen: usize,
    pub pages_parsed: usize,
    pub skipped_pages: Vec<SkippedPage>,
    /// Function blocks without a usable signature, across all pages
    pub skipped_blocks: usize,
    /// Operations replaced by a later definition of the same name
    pub duplicates: usize,
    pub stats: RegistryStats,
}

pub struct RegistryBuilder {
    docs_dir: Utf8PathBuf,
}

impl RegistryBuilder {
    pub fn new(docs_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
        }
    }

    /// Parse every `bpy.*.html` page under the corpus directory.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::ReadFailed` if the directory cannot be listed and
    /// `RegistryError::EmptyCorpus` if it holds no documentation pages.
    pub fn build(&self) -> Result<(Registry, BuildReport), RegistryError> {
        let files = self.page_files()?;
        if files.is_empty() {
            return Err(RegistryError::EmptyCorpus {
                path: self.docs_dir.to_string(),
            });
        }

        info!(docs_dir = %self.docs_dir, pages = files.len(), "Building operation registry");

        let mut unreadable = Vec::new();
        let mut pages = Vec::with_capacity(files.len());
        for path in files {
            let file = path.file_name().unwrap_or(path.as_str()).to_string();
            match std::fs::read_to_string(&path) {
                Ok(html) => pages.push((file, html)),
                Err(e) => {
                    warn!(file = %file, error = %e, "Skipping unreadable page");
                    unreadable.push(SkippedPage {
                        file,
                        reason: format!("unreadable: {e}"),
                    });
                }
            }
        }

        let (registry, mut report) = Self::build_from_pages(pages, Utc::now());
        report.pages_seen += unreadable.len();
        report.skipped_pages.extend(unreadable);

        info!(
            total = report.stats.total,
            pages_parsed = report.pages_parsed,
            pages_skipped = report.skipped_pages.len(),
            duplicates = report.duplicates,
            version = %registry.version(),
            "Operation registry built"
        );

        Ok((registry, report))
    }

    /// Build from in-memory `(file name, html)` pages, in the given order.
    pub fn build_from_pages<I>(pages: I, built_at: DateTime<Utc>) -> (Registry, BuildReport)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut report = BuildReport::default();
        let mut operations: Vec<OperationSpec> = Vec::new();
        let mut seen = HashSet::new();

        for (file, html) in pages {
            report.pages_seen += 1;
            let parsed = parse_page(&html);

            if parsed.skipped_blocks > 0 {
                warn!(
                    file = %file,
                    skipped_blocks = parsed.skipped_blocks,
                    "Skipped function blocks without a usable signature"
                );
                report.skipped_blocks += parsed.skipped_blocks;
            }

            if parsed.operations.is_empty() {
                warn!(file = %file, "Skipping page with no parseable operations");
                report.skipped_pages.push(SkippedPage {
                    file,
                    reason: "no parseable operation blocks".to_string(),
                });
                continue;
            }

            debug!(file = %file, operations = parsed.operations.len(), "Parsed page");
            report.pages_parsed += 1;
            for op in parsed.operations {
                if !seen.insert(op.name.clone()) {
                    report.duplicates += 1;
                }
                operations.push(op);
            }
        }

        let registry = Registry::from_operations(operations, built_at);
        report.stats = registry.stats();
        (registry, report)
    }

    fn page_files(&self) -> Result<Vec<Utf8PathBuf>, RegistryError> {
        let read_failed = |e: std::io::Error| RegistryError::ReadFailed {
            path: self.docs_dir.to_string(),
            reason: e.to_string(),
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.docs_dir).map_err(read_failed)? {
            let entry = entry.map_err(read_failed)?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                warn!(path = ?entry.path(), "Skipping non-UTF-8 path");
                continue;
            };
            if is_page(&path) && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_page(path: &Utf8Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.starts_with("bpy.") && name.ends_with(".html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::tests::CUBE_PAGE;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn page_for(ops: &[(String, String)]) -> String {
        let mut html = String::from("<html><body>");
        for (name, description) in ops {
            html.push_str(&format!(
                "<dl class=\"py function\"><dt class=\"sig sig-object py\" id=\"{name}\"></dt><dd><p>{description}</p></dd></dl>"
            ));
        }
        html.push_str("</body></html>");
        html
    }

    #[test]
    fn test_build_from_directory() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("bpy.ops.mesh.html"), CUBE_PAGE).unwrap();
        std::fs::write(root.join("bpy.ops.empty.html"), "<html></html>").unwrap();
        std::fs::write(root.join("index.html"), CUBE_PAGE).unwrap();

        let (registry, report) = RegistryBuilder::new(root).build().unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(report.pages_seen, 2);
        assert_eq!(report.pages_parsed, 1);
        assert_eq!(report.skipped_blocks, 1);
        assert_eq!(report.skipped_pages.len(), 1);
        assert_eq!(report.skipped_pages[0].file, "bpy.ops.empty.html");
        assert_eq!(report.stats.categories["mesh_operators"], 1);
    }

    #[test]
    fn test_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("readme.txt"), "not a page").unwrap();

        assert!(matches!(
            RegistryBuilder::new(root).build(),
            Err(RegistryError::EmptyCorpus { .. })
        ));
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            RegistryBuilder::new("/definitely/not/here").build(),
            Err(RegistryError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_last_seen_wins() {
        let pages = vec![
            ("bpy.a.html".to_string(), page_for(&[("bpy.ops.mesh.x".into(), "first".into())])),
            ("bpy.b.html".to_string(), page_for(&[("bpy.ops.mesh.x".into(), "second".into())])),
        ];
        let (registry, report) = RegistryBuilder::build_from_pages(pages, Utc::now());
        assert_eq!(registry.len(), 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(registry.lookup("bpy.ops.mesh.x").unwrap().description, "second");
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let pages = || vec![("bpy.ops.mesh.html".to_string(), CUBE_PAGE.to_string())];
        let (a, _) = RegistryBuilder::build_from_pages(pages(), Utc::now());
        let (b, _) = RegistryBuilder::build_from_pages(pages(), Utc::now());
        assert_eq!(a.operations(), b.operations());
        assert_eq!(a.version(), b.version());
    }

    proptest! {
        #[test]
        fn prop_names_are_unique(
            pages in prop::collection::vec(
                prop::collection::vec((0u8..6, "[a-z]{1,8}"), 0..6),
                1..5,
            )
        ) {
            let html_pages: Vec<(String, String)> = pages
                .iter()
                .enumerate()
                .map(|(i, ops)| {
                    let ops: Vec<(String, String)> = ops
                        .iter()
                        .map(|(n, d)| (format!("bpy.ops.mesh.op{n}"), d.clone()))
                        .collect();
                    (format!("bpy.{i}.html"), page_for(&ops))
                })
                .collect();

            let expected: HashSet<String> = pages
                .iter()
                .flatten()
                .map(|(n, _)| format!("bpy.ops.mesh.op{n}"))
                .collect();

            let (registry, _) = RegistryBuilder::build_from_pages(html_pages, Utc::now());
            let names: Vec<&String> = registry.operations().keys().collect();
            let unique: HashSet<&String> = names.iter().copied().collect();
            prop_assert_eq!(names.len(), unique.len());
            prop_assert_eq!(registry.len(), expected.len());

            // The last definition of each name is the one kept
            for ops in &pages {
                for (n, _) in ops {
                    let name = format!("bpy.ops.mesh.op{n}");
                    let last = pages
                        .iter()
                        .flatten()
                        .filter(|(m, _)| m == n)
                        .last()
                        .map(|(_, d)| d.clone())
                        .unwrap();
                    prop_assert_eq!(&registry.lookup(&name).unwrap().description, &last);
                }
            }
        }
    }
}
