use anyhow::{Context, Result};

use crate::commands::{CommandReport, PipelineOptions, finish, merge_into_store, prepare};
use crate::error::Stage;
use crate::ingest::config::IngestConfig;
use crate::ingest::paths::IngestPaths;
use crate::ingest::payload::read_intermediate;

fn execute(paths: &IngestPaths, config: &IngestConfig, dry_run: bool) -> Result<CommandReport> {
    let mut report = CommandReport::new("push");

    let records = read_intermediate(&paths.cleaned_file).with_context(|| {
        format!(
            "{} failed to read {}",
            Stage::Load,
            paths.cleaned_file.display()
        )
    })?;
    report.detail(format!("cleaned.path={}", paths.cleaned_file.display()));

    merge_into_store(paths, config, &records, dry_run, &mut report)?;
    Ok(report)
}

pub fn run(opts: &PipelineOptions) -> Result<CommandReport> {
    let (paths, config) = prepare(opts)?;
    finish(&paths, "push", execute(&paths, &config, opts.dry_run))
}
