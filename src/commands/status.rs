use anyhow::Result;

use crate::commands::{CommandReport, PipelineOptions};
use crate::env_loader::active_overrides;
use crate::ingest::config::load_config;
use crate::ingest::paths::resolve_paths;
use crate::ingest::store;

/// Read-only: nothing is created, locked or written.
pub fn run(opts: &PipelineOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?.with_overrides(&opts.paths);
    let mut report = CommandReport::new("status");

    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("input_file={}", paths.input_file.display()));
    report.detail(format!("cleaned_file={}", paths.cleaned_file.display()));
    report.detail(format!("store_file={}", paths.store_file.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("input_present={}", paths.input_file.exists()));
    report.detail(format!("cleaned_present={}", paths.cleaned_file.exists()));

    match load_config(&paths, opts.config_path.as_deref()) {
        Ok(cfg) => {
            report.detail(format!("dedup.title_threshold={}", cfg.dedup.title_threshold));
            report.detail(format!(
                "dedup.content_threshold={}",
                cfg.dedup.content_threshold
            ));
            report.detail(format!("dedup.within_batch={}", cfg.dedup.within_batch));
            report.detail(format!(
                "dedup.id_collision={}",
                cfg.dedup.id_collision.as_str()
            ));
            report.detail(format!("repair.strategy={}", cfg.repair.strategy.as_str()));
            report.detail(format!("payload.field={}", cfg.payload.field));
        }
        Err(err) => report.issue(format!("config: {err:#}")),
    }

    match store::load(&paths.store_file) {
        Ok(loaded) => {
            report.detail(format!("store.articles={}", loaded.store.articles.len()));
            match loaded.digest {
                Some(digest) => report.detail(format!("store.sha256={digest}")),
                None => report.detail("store.present=false"),
            }
        }
        Err(err) => report.issue(format!("store: {err:#}")),
    }

    for (key, value) in active_overrides() {
        report.detail(format!("env.{key}={value}"));
    }

    Ok(report)
}
