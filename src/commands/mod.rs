pub mod clean;
pub mod ingest;
pub mod push;
pub mod status;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::Stage;
use crate::ingest::audit::{RunRecord, append_record};
use crate::ingest::config::{IngestConfig, load_config};
use crate::ingest::merge::{MergeOutcome, SkipReason, merge};
use crate::ingest::paths::{IngestPaths, PathOverrides, resolve_paths};
use crate::ingest::store::{self, lock_store};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Options shared by every pipeline command.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub paths: PathOverrides,
    pub config_path: Option<PathBuf>,
    /// Run every stage but skip the final write.
    pub dry_run: bool,
}

pub fn prepare(opts: &PipelineOptions) -> Result<(IngestPaths, IngestConfig)> {
    let paths = resolve_paths()?.with_overrides(&opts.paths);
    let config = load_config(&paths, opts.config_path.as_deref())?;
    Ok((paths, config))
}

/// Record the outcome in the audit log and hand it back unchanged.
pub fn finish(
    paths: &IngestPaths,
    command: &str,
    outcome: Result<CommandReport>,
) -> Result<CommandReport> {
    let (status, message) = match &outcome {
        Ok(report) if report.ok => ("ok", report.details.join(" ")),
        Ok(report) => ("issues", report.issues.join("; ")),
        Err(err) => ("failed", format!("{err:#}")),
    };
    let appended = RunRecord::now(command, status, &message)
        .and_then(|record| append_record(&paths.logs_dir, &record));
    if let Err(err) = appended {
        warn!(error = %format!("{err:#}"), "failed to append audit event");
    }
    outcome
}

fn describe_outcome(outcome: &MergeOutcome, report: &mut CommandReport) {
    let stats = outcome.stats;
    report.detail(format!("records.seen={}", stats.seen));
    report.detail(format!("records.invalid={}", stats.invalid));
    report.detail(format!("records.duplicate={}", stats.duplicates));
    report.detail(format!("records.id_collisions={}", stats.id_collisions));
    report.detail(format!("records.rekeyed={}", stats.rekeyed));
    report.detail(format!("records.merged={}", stats.merged));

    for rejection in &outcome.rejected {
        report.detail(format!(
            "invalid index={} error={}",
            rejection.index, rejection.error
        ));
    }
    for skipped in &outcome.skipped {
        match &skipped.reason {
            SkipReason::Duplicate(found) => report.detail(format!(
                "duplicate id={} matched={} title_ratio={:.3} content_ratio={:.3}",
                skipped.id, found.existing_id, found.title_ratio, found.content_ratio
            )),
            SkipReason::IdCollision(id) => {
                report.detail(format!("id_collision id={id} title={:?}", skipped.title))
            }
        }
    }
}

/// Lock, load, dedup, prepend and persist. The store is only rewritten when
/// at least one article was accepted.
pub fn merge_into_store(
    paths: &IngestPaths,
    config: &IngestConfig,
    records: &[Value],
    dry_run: bool,
    report: &mut CommandReport,
) -> Result<()> {
    let lock = lock_store(&paths.store_file)
        .with_context(|| format!("{} failed to lock store", Stage::Load))?;
    let loaded = store::load(&paths.store_file).with_context(|| {
        format!(
            "{} failed to load store {}",
            Stage::Load,
            paths.store_file.display()
        )
    })?;
    let before = loaded.store.articles.len();

    let outcome = merge(records, loaded.store, config);
    describe_outcome(&outcome, report);
    report.detail(format!("store.path={}", paths.store_file.display()));
    report.detail(format!("store.articles_before={before}"));

    if !outcome.changed() {
        info!(store = %paths.store_file.display(), "nothing new to merge; store untouched");
        report.detail("store.changed=false");
        return Ok(());
    }
    if dry_run {
        report.detail("dry_run=true");
        report.detail(format!(
            "store.articles_after={}",
            outcome.store.articles.len()
        ));
        return Ok(());
    }

    let digest = store::save(&paths.store_file, &outcome.store).with_context(|| {
        format!(
            "{} failed to write store {}",
            Stage::Persist,
            paths.store_file.display()
        )
    })?;
    drop(lock);
    info!(
        merged = outcome.stats.merged,
        total = outcome.store.articles.len(),
        "store updated"
    );
    report.detail("store.changed=true");
    report.detail(format!(
        "store.articles_after={}",
        outcome.store.articles.len()
    ));
    report.detail(format!("store.sha256={digest}"));
    Ok(())
}
