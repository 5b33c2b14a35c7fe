use anyhow::{Context, Result};
use tracing::info;

use crate::commands::{CommandReport, PipelineOptions, finish, prepare};
use crate::error::Stage;
use crate::ingest::article::ArticleDocument;
use crate::ingest::config::IngestConfig;
use crate::ingest::normalize::normalize_all;
use crate::ingest::paths::IngestPaths;
use crate::ingest::payload::{parse_payload, read_payload_field};
use crate::ingest::store::write_json_atomic;

fn execute(paths: &IngestPaths, config: &IngestConfig, dry_run: bool) -> Result<CommandReport> {
    let mut report = CommandReport::new("clean");

    let payload = read_payload_field(&paths.input_file, &config.payload.field).with_context(|| {
        format!(
            "{} failed to read {}",
            Stage::Load,
            paths.input_file.display()
        )
    })?;
    let batch = parse_payload(&payload, config.repair.strategy).with_context(|| {
        format!(
            "{} failed to salvage payload from {}",
            Stage::Repair,
            paths.input_file.display()
        )
    })?;
    report.detail(format!("input.path={}", paths.input_file.display()));
    report.detail(format!("input.repaired={}", batch.repaired));

    let normalized = normalize_all(&batch.records, &config.normalize);
    report.detail(format!("records.seen={}", batch.records.len()));
    report.detail(format!("records.invalid={}", normalized.rejected.len()));
    report.detail(format!("records.cleaned={}", normalized.articles.len()));
    for rejection in &normalized.rejected {
        report.detail(format!(
            "invalid index={} error={}",
            rejection.index, rejection.error
        ));
    }

    if dry_run {
        report.detail("dry_run=true");
        return Ok(report);
    }

    let cleaned = normalized.articles.len();
    let doc = ArticleDocument::new(normalized.articles);
    let digest = write_json_atomic(&paths.cleaned_file, &doc).with_context(|| {
        format!(
            "{} failed to write {}",
            Stage::Persist,
            paths.cleaned_file.display()
        )
    })?;
    info!(path = %paths.cleaned_file.display(), cleaned, "wrote normalized intermediate");
    report.detail(format!("cleaned.path={}", paths.cleaned_file.display()));
    report.detail(format!("cleaned.sha256={digest}"));
    Ok(report)
}

pub fn run(opts: &PipelineOptions) -> Result<CommandReport> {
    let (paths, config) = prepare(opts)?;
    finish(&paths, "clean", execute(&paths, &config, opts.dry_run))
}
