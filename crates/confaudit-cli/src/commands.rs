// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use confaudit_core::{resolve_config_path, ConfigPathScope};
use confaudit_engine::{
    find_all_matches, generate_match_report, load_expected_config, load_key_map, load_snapshot,
    suggest_mappings, write_match_table, Engine, EngineOptions, ResolvedOptions,
};
use confaudit_model::{ExpectedConfig, Snapshot};
use serde_json::json;
use tracing::{debug, info};

use crate::output::{emit_ok, notice, write_json_file, write_text_file};
use crate::{CliError, OutputMode};

pub(crate) struct ValidateArgs {
    pub(crate) snapshot: PathBuf,
    pub(crate) config: PathBuf,
    pub(crate) key_map: Option<PathBuf>,
    pub(crate) config_file: Option<PathBuf>,
    pub(crate) out: Option<PathBuf>,
    pub(crate) fail_on_wrong_expectation: bool,
}

fn resolve_options(config_file: Option<&Path>) -> Result<ResolvedOptions, CliError> {
    let resolved = EngineOptions::load(config_file).map_err(|e| CliError::config(e.to_string()))?;
    match &resolved.source {
        Some(path) => debug!(source = %path.display(), "engine options loaded"),
        None => debug!("engine options defaulted"),
    }
    Ok(resolved)
}

fn read_snapshot(path: &Path) -> Result<Snapshot, CliError> {
    load_snapshot(path).map_err(|e| CliError::input(path, e.to_string()))
}

fn read_expected(path: &Path) -> Result<ExpectedConfig, CliError> {
    load_expected_config(path).map_err(|e| CliError::input(path, e.to_string()))
}

pub(crate) fn run_validate(args: ValidateArgs, output_mode: OutputMode) -> Result<(), CliError> {
    let resolved = resolve_options(args.config_file.as_deref())?;
    let snapshot = read_snapshot(&args.snapshot)?;
    let config = read_expected(&args.config)?;

    let mut engine = Engine::new(resolved.options);
    if let Some(path) = &args.key_map {
        let key_map = load_key_map(path).map_err(|e| CliError::input(path, e.to_string()))?;
        info!(entries = key_map.len(), "key map loaded");
        engine = engine.with_key_map(key_map);
    }

    let report = engine.validate(&snapshot, &config);

    match &args.out {
        Some(out) => {
            write_json_file(out, &report).map_err(CliError::internal)?;
            emit_ok(
                output_mode,
                &json!({
                    "command": "validate",
                    "out": out,
                    "summary": report.summary,
                    "matchPercentage": report.match_percentage,
                    "likelyWrongExpectation": report.likely_wrong_expectation,
                }),
            )
            .map_err(CliError::internal)?;
        }
        None => emit_ok(output_mode, &report).map_err(CliError::internal)?,
    }

    if report.likely_wrong_expectation {
        notice(
            output_mode,
            &format!(
                "warning: {} of {} checks mismatched; \
                 the expected config may belong to another machine",
                report.mismatched_count, report.total_checks
            ),
        );
        if args.fail_on_wrong_expectation {
            return Err(CliError::wrong_expectation(
                report.match_percentage,
                report.mismatch_ratio,
            ));
        }
    }
    Ok(())
}

pub(crate) fn run_suggest(
    snapshot: &Path,
    config: &Path,
    threshold: Option<f64>,
    config_file: Option<&Path>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let threshold = match threshold {
        Some(value) => value,
        None => resolve_options(config_file)?.options.suggestion_threshold,
    };
    let snapshot = read_snapshot(snapshot)?;
    let config = read_expected(config)?;
    let suggestions = suggest_mappings(&config, &snapshot, threshold);
    emit_ok(
        output_mode,
        &json!({
            "command": "suggest",
            "threshold": threshold,
            "suggestions": suggestions,
        }),
    )
    .map_err(CliError::internal)
}

pub(crate) fn run_search(
    snapshot: &Path,
    query: &str,
    min_similarity: f64,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let snapshot = read_snapshot(snapshot)?;
    let matches = find_all_matches(&snapshot, query, min_similarity);
    emit_ok(
        output_mode,
        &json!({
            "command": "search",
            "query": query,
            "minSimilarity": min_similarity,
            "matches": matches,
        }),
    )
    .map_err(CliError::internal)
}

pub(crate) struct MatchReportArgs {
    pub(crate) snapshot: PathBuf,
    pub(crate) config: PathBuf,
    pub(crate) min_similarity: f64,
    pub(crate) out: Option<PathBuf>,
    pub(crate) csv: Option<PathBuf>,
}

pub(crate) fn run_match_report(
    args: MatchReportArgs,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let config = read_expected(&args.config)?;
    let report = generate_match_report(&snapshot, &config, args.min_similarity);
    info!(keys = report.entries.len(), "match report generated");

    if let Some(csv) = &args.csv {
        write_text_file(csv, |out| write_match_table(&report, out)).map_err(CliError::internal)?;
    }
    match &args.out {
        Some(out) => {
            write_json_file(out, &report).map_err(CliError::internal)?;
            emit_ok(
                output_mode,
                &json!({
                    "command": "match-report",
                    "out": out,
                    "csv": args.csv,
                    "keys": report.entries.len(),
                }),
            )
            .map_err(CliError::internal)
        }
        None => emit_ok(output_mode, &report).map_err(CliError::internal),
    }
}

pub(crate) fn run_config(
    config_file: Option<&Path>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let resolved = resolve_options(config_file)?;
    emit_ok(
        output_mode,
        &json!({
            "command": "config",
            "workspace_config": resolve_config_path(ConfigPathScope::Workspace),
            "user_config": resolve_config_path(ConfigPathScope::User),
            "source": resolved.source,
            "options": resolved.options,
        }),
    )
    .map_err(CliError::internal)
}
