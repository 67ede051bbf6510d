//! JSON emit functions for CLI output
//!
//! Every `--json` output goes through JCS (RFC 8785) so it diffs cleanly.

use anyhow::{Context, Result};

use crate::{BuildReport, OperationSpec, PipelineRun, RegistryStats, SearchHit, emit_jcs};

pub fn emit_build_report_json(report: &BuildReport) -> Result<String> {
    emit_jcs(report).context("Failed to emit build report JSON")
}

pub fn emit_stats_json(stats: &RegistryStats) -> Result<String> {
    emit_jcs(stats).context("Failed to emit registry stats JSON")
}

pub fn emit_search_json(hits: &[SearchHit]) -> Result<String> {
    emit_jcs(&hits).context("Failed to emit search JSON")
}

pub fn emit_operation_json(operation: &OperationSpec) -> Result<String> {
    emit_jcs(operation).context("Failed to emit operation JSON")
}

/// The whole run record, including partial results of a failed run
pub fn emit_run_json(run: &PipelineRun) -> Result<String> {
    emit_jcs(run).context("Failed to emit run JSON")
}
