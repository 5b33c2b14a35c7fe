use crate::ingest::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const AUDIT_FILE: &str = "audit.log";

/// One line of `audit.log`: which command ran and how it ended.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord<'a> {
    pub at_epoch_secs: u64,
    pub command: &'a str,
    pub status: &'a str,
    pub message: &'a str,
}

impl<'a> RunRecord<'a> {
    pub fn now(command: &'a str, status: &'a str, message: &'a str) -> Result<Self> {
        Ok(Self {
            at_epoch_secs: now_epoch_secs()?,
            command,
            status,
            message,
        })
    }

    fn to_line(&self) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Append `record` to `<logs_dir>/audit.log`, creating the directory first.
pub fn append_record(logs_dir: &Path, record: &RunRecord<'_>) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create {}", logs_dir.display()))?;
    let path = logs_dir.join(AUDIT_FILE);
    let line = record.to_line()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| file.write_all(&line))
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(path)
}
