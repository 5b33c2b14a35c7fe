use anyhow::{Context, Result};

use crate::commands::{CommandReport, PipelineOptions, finish, merge_into_store, prepare};
use crate::error::Stage;
use crate::ingest::config::IngestConfig;
use crate::ingest::paths::IngestPaths;
use crate::ingest::payload::{parse_payload, read_payload_field};

/// Input straight to store in one run, without the intermediate file.
fn execute(paths: &IngestPaths, config: &IngestConfig, dry_run: bool) -> Result<CommandReport> {
    let mut report = CommandReport::new("ingest");

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

    merge_into_store(paths, config, &batch.records, dry_run, &mut report)?;
    Ok(report)
}

pub fn run(opts: &PipelineOptions) -> Result<CommandReport> {
    let (paths, config) = prepare(opts)?;
    finish(&paths, "ingest", execute(&paths, &config, opts.dry_run))
}
