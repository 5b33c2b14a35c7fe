use crate::error::IngestError;
use crate::ingest::dedup::DedupThresholds;
use crate::ingest::paths::IngestPaths;
use crate::ingest::salvage::RepairStrategy;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do when a novel article arrives with an id the store already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IdCollisionPolicy {
    /// Give the newcomer a fresh UUID so ids stay unique.
    #[default]
    Rekey,
    /// Treat the id as a dedup key and drop the newcomer.
    Skip,
    /// Accept the collision.
    Keep,
}

impl IdCollisionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rekey => "rekey",
            Self::Skip => "skip",
            Self::Keep => "keep",
        }
    }
}

impl FromStr for IdCollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rekey" => Ok(Self::Rekey),
            "skip" => Ok(Self::Skip),
            "keep" => Ok(Self::Keep),
            other => Err(format!(
                "unknown id collision policy `{other}`; use `rekey`, `skip` or `keep`"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub title_threshold: f64,
    pub content_threshold: f64,
    pub within_batch: bool,
    pub id_collision: IdCollisionPolicy,
    pub scan_warn_limit: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_threshold: 0.95,
            content_threshold: 0.90,
            within_batch: false,
            id_collision: IdCollisionPolicy::Rekey,
            scan_warn_limit: 5_000,
        }
    }
}

impl DedupConfig {
    pub fn thresholds(&self) -> DedupThresholds {
        DedupThresholds {
            title: self.title_threshold,
            content: self.content_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeRules {
    pub finance_keywords: Vec<String>,
    pub shortlink_hosts: Vec<String>,
}

impl Default for NormalizeRules {
    fn default() -> Self {
        Self {
            finance_keywords: [
                "acquisition",
                "inflation",
                "tax",
                "investment",
                "shares",
                "ipo",
                "rates",
                "credit",
            ]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
            shortlink_hosts: ["t.co", "bit.ly"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepairConfig {
    pub strategy: RepairStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    pub field: String,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            field: "ai_response".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    pub dedup: DedupConfig,
    pub normalize: NormalizeRules,
    pub repair: RepairConfig,
    pub payload: PayloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialIngestConfig {
    dedup: Option<DedupConfig>,
    normalize: Option<NormalizeRules>,
    repair: Option<RepairConfig>,
    payload: Option<PayloadConfig>,
}

fn parse_override<T>(var: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| anyhow!("{var}: cannot use `{raw}`: {err}"))
}

fn parse_flag(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{var}: cannot use `{raw}`: expected true or false")),
    }
}

/// A set but unparseable override is an error, never a silent fallback.
fn env_or_parsed<T>(var: &str, fallback: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => parse_override(var, &v),
        _ => Ok(fallback),
    }
}

fn env_or_bool(var: &str, fallback: bool) -> Result<bool> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => parse_flag(var, &v),
        _ => Ok(fallback),
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn lowercase_all(values: &mut Vec<String>) {
    *values = values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
}

fn validate(cfg: &IngestConfig) -> Result<()> {
    let t = cfg.dedup.title_threshold;
    let c = cfg.dedup.content_threshold;
    if !(t > 0.0 && t <= 1.0) {
        return Err(anyhow!(
            "invalid title threshold: require 0 < title_threshold <= 1.0"
        ));
    }
    if !(c > 0.0 && c <= 1.0) {
        return Err(anyhow!(
            "invalid content threshold: require 0 < content_threshold <= 1.0"
        ));
    }
    if cfg.payload.field.trim().is_empty() {
        return Err(anyhow!("invalid payload field: cannot be empty"));
    }
    if cfg.normalize.finance_keywords.is_empty() {
        return Err(anyhow!("invalid finance keywords: list cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path(paths: &IngestPaths, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(custom) = env::var("APODICTIC_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    paths.home.join("apodictic.toml")
}

fn merge_file_config(base: &mut IngestConfig, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path).map_err(|err| {
        IngestError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
    })?;
    let parsed: PartialIngestConfig = toml::from_str(&raw).map_err(|err| {
        IngestError::InvalidConfig(format!("failed to parse {}: {err}", path.display()))
    })?;
    if let Some(dedup) = parsed.dedup {
        base.dedup = dedup;
    }
    if let Some(normalize) = parsed.normalize {
        base.normalize = normalize;
    }
    if let Some(repair) = parsed.repair {
        base.repair = repair;
    }
    if let Some(payload) = parsed.payload {
        base.payload = payload;
    }
    Ok(())
}

fn finalize(mut cfg: IngestConfig) -> Result<IngestConfig> {
    lowercase_all(&mut cfg.normalize.finance_keywords);
    lowercase_all(&mut cfg.normalize.shortlink_hosts);
    cfg.payload.field = cfg.payload.field.trim().to_string();
    validate(&cfg)?;
    Ok(cfg)
}

/// Defaults, then the TOML file, then `APODICTIC_*` overrides, then
/// validation. An explicitly requested file must exist.
pub fn load_config(paths: &IngestPaths, explicit: Option<&Path>) -> Result<IngestConfig> {
    let mut cfg = IngestConfig::default();
    let path = resolve_config_path(paths, explicit);
    if explicit.is_some() || path.exists() {
        merge_file_config(&mut cfg, &path)?;
    }

    cfg.dedup.title_threshold =
        env_or_parsed("APODICTIC_TITLE_THRESHOLD", cfg.dedup.title_threshold)?;
    cfg.dedup.content_threshold =
        env_or_parsed("APODICTIC_CONTENT_THRESHOLD", cfg.dedup.content_threshold)?;
    cfg.dedup.within_batch = env_or_bool("APODICTIC_DEDUP_WITHIN_BATCH", cfg.dedup.within_batch)?;
    cfg.dedup.id_collision = env_or_parsed("APODICTIC_ID_COLLISION", cfg.dedup.id_collision)?;
    cfg.dedup.scan_warn_limit =
        env_or_parsed("APODICTIC_SCAN_WARN_LIMIT", cfg.dedup.scan_warn_limit)?;
    cfg.repair.strategy = env_or_parsed("APODICTIC_REPAIR_STRATEGY", cfg.repair.strategy)?;
    cfg.payload.field = env_or_string("APODICTIC_PAYLOAD_FIELD", &cfg.payload.field);

    finalize(cfg)
}
