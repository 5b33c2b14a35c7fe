use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport, PipelineOptions};
use crate::ingest::paths::PathOverrides;
use crate::logging;

#[derive(Parser, Debug)]
#[command(name = "apodictic", version)]
#[command(about = "Repair, normalize, deduplicate and merge AI-generated articles into the store")]
pub struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML config file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Ingestion input holding the AI payload
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Normalized intermediate file
    #[arg(long, value_name = "PATH")]
    pub cleaned: Option<PathBuf>,

    /// Article store
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,
}

impl PathArgs {
    fn overrides(&self) -> PathOverrides {
        PathOverrides {
            input_file: self.input.clone(),
            cleaned_file: self.cleaned.clone(),
            store_file: self.store.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Repair and normalize the input into the intermediate file
    Clean {
        #[command(flatten)]
        paths: PathArgs,
        /// Report without writing the intermediate file
        #[arg(long)]
        dry_run: bool,
    },
    /// Merge the intermediate file into the store
    Push {
        #[command(flatten)]
        paths: PathArgs,
        /// Report without rewriting the store
        #[arg(long)]
        dry_run: bool,
    },
    /// Repair, normalize and merge the input into the store in one run
    Ingest {
        #[command(flatten)]
        paths: PathArgs,
        /// Report without rewriting the store
        #[arg(long)]
        dry_run: bool,
    },
    /// Show resolved paths, effective config and store summary
    Status {
        #[command(flatten)]
        paths: PathArgs,
    },
}

fn options(paths: &PathArgs, config: &Option<PathBuf>, dry_run: bool) -> PipelineOptions {
    PipelineOptions {
        paths: paths.overrides(),
        config_path: config.clone(),
        dry_run,
    }
}

fn render_text(report: &CommandReport) -> String {
    let mut out = format!(
        "{}: {}\n",
        report.command,
        if report.ok { "ok" } else { "issues" }
    );
    for detail in &report.details {
        out.push_str(&format!("  {detail}\n"));
    }
    for issue in &report.issues {
        out.push_str(&format!("  issue: {issue}\n"));
    }
    out
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let report = match &cli.command {
        Command::Clean { paths, dry_run } => {
            commands::clean::run(&options(paths, &cli.config, *dry_run))?
        }
        Command::Push { paths, dry_run } => {
            commands::push::run(&options(paths, &cli.config, *dry_run))?
        }
        Command::Ingest { paths, dry_run } => {
            commands::ingest::run(&options(paths, &cli.config, *dry_run))?
        }
        Command::Status { paths } => commands::status::run(&options(paths, &cli.config, false))?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        bail!(
            "{} reported {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}
