//! Registry command implementations
//!
//! Handles `scenesmith build-registry`, `stats`, `search` and `show`.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;

use super::common::{load_registry, next_steps_hint, registry_out_path};
use super::json_emit::{
    emit_build_report_json, emit_operation_json, emit_search_json, emit_stats_json,
};

use crate::error::ConfigError;
use crate::{Config, OperationSpec, RegistryBuilder, RegistryStats, persist};

/// Execute the build-registry command
pub fn execute_build_registry_command(
    docs: Option<&str>,
    out: Option<&str>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let docs_dir = match docs {
        Some(dir) => Utf8PathBuf::from(dir),
        None => config.registry.docs_dir.clone().ok_or_else(|| ConfigError::InvalidValue {
            key: "registry_docs_dir".to_string(),
            value: "not set (pass --docs or set [registry] docs_dir)".to_string(),
        })?,
    };

    let (registry, report) = RegistryBuilder::new(docs_dir.clone())
        .build()
        .with_context(|| format!("Failed to build registry from {docs_dir}"))?;

    let out_path = registry_out_path(out, config);
    persist::save(&registry, &out_path)
        .with_context(|| format!("Failed to write registry to {out_path}"))?;

    if json {
        println!("{}", emit_build_report_json(&report)?);
        return Ok(());
    }

    println!("Built registry {} from {docs_dir}", registry.version());
    println!(
        "  Pages: {} seen, {} parsed, {} skipped",
        report.pages_seen,
        report.pages_parsed,
        report.skipped_pages.len()
    );
    for skipped in &report.skipped_pages {
        println!("    - {}: {}", skipped.file, skipped.reason);
    }
    if report.skipped_blocks > 0 {
        println!("  Skipped blocks: {}", report.skipped_blocks);
    }
    if report.duplicates > 0 {
        println!("  Duplicates replaced: {}", report.duplicates);
    }
    print_stats(&report.stats);
    println!("  Written to: {out_path}");
    println!();
    println!("{}", next_steps_hint(out_path.as_str()));
    Ok(())
}

/// Execute the stats command
pub fn execute_stats_command(json: bool, config: &Config) -> Result<()> {
    let registry = load_registry(config)?;
    let stats = registry.stats();

    if json {
        println!("{}", emit_stats_json(&stats)?);
        return Ok(());
    }

    println!("Registry: {}", config.registry_path());
    println!("  Version: {}", registry.version());
    println!("  Built: {}", registry.built_at().to_rfc3339());
    print_stats(&stats);
    Ok(())
}

/// Execute the search command
pub fn execute_search_command(
    query: &str,
    category: Option<&str>,
    limit: usize,
    json: bool,
    config: &Config,
) -> Result<()> {
    let registry = load_registry(config)?;
    let hits = registry.search_in(query, category, limit);

    if json {
        println!("{}", emit_search_json(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No operations match '{query}'");
        return Ok(());
    }
    for hit in &hits {
        let description = registry
            .get(&hit.name)
            .map(|spec| spec.description.as_str())
            .unwrap_or_default();
        println!(
            "{:>4}  {}  ({} term(s))",
            hit.score, hit.name, hit.matched_terms
        );
        if !description.is_empty() {
            println!("      {description}");
        }
    }
    Ok(())
}

/// Execute the show command
pub fn execute_show_command(operation: &str, json: bool, config: &Config) -> Result<()> {
    let registry = load_registry(config)?;
    let spec = registry
        .lookup(operation)
        .with_context(|| format!("Failed to show operation {operation}"))?;

    if json {
        println!("{}", emit_operation_json(spec)?);
    } else {
        print!("{}", render_signature(spec));
    }
    Ok(())
}

fn print_stats(stats: &RegistryStats) {
    println!("  Operations: {}", stats.total);
    for (label, counts) in [
        ("Categories", &stats.categories),
        ("Modules", &stats.modules),
        ("Parameter types", &stats.parameter_types),
    ] {
        println!("  {label}:");
        for (name, count) in counts {
            println!("    {name}: {count}");
        }
    }
}

/// Human-readable signature block for one operation
fn render_signature(spec: &OperationSpec) -> String {
    let mut out = String::new();
    let params: Vec<String> = spec
        .parameters
        .iter()
        .map(|p| match &p.default {
            Some(default) => format!("{}={default}", p.name),
            None => p.name.clone(),
        })
        .collect();
    out.push_str(&format!("{}({})\n", spec.name, params.join(", ")));
    if !spec.description.is_empty() {
        out.push_str(&format!("  {}\n", spec.description));
    }
    out.push_str(&format!(
        "  Class: {}  Categories: {}\n",
        spec.class(),
        spec.categories.join(", ")
    ));

    for p in &spec.parameters {
        let required = if p.required { " (required)" } else { "" };
        out.push_str(&format!("  - {}: {}{required}\n", p.name, p.param_type));
        if let Some(values) = &p.enum_values {
            out.push_str(&format!("      one of: {}\n", values.join(", ")));
        }
        if let Some(constraints) = &p.constraints {
            out.push_str(&format!("      {constraints}\n"));
        }
    }
    out
}
