use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct IngestPaths {
    pub home: PathBuf,
    pub input_file: PathBuf,
    pub cleaned_file: PathBuf,
    pub store_file: PathBuf,
    pub logs_dir: PathBuf,
}

/// Command-line overrides; a `Some` wins over the environment.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub input_file: Option<PathBuf>,
    pub cleaned_file: Option<PathBuf>,
    pub store_file: Option<PathBuf>,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<IngestPaths> {
    let home = match env::var("APODICTIC_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join("apodictic"),
    };

    let input_file = env_or_default_path("APODICTIC_INPUT_FILE", home.join("ai-output.json"));
    let cleaned_file = env_or_default_path(
        "APODICTIC_CLEANED_FILE",
        home.join("cleaned-ai-output.json"),
    );
    let store_file = env_or_default_path("APODICTIC_STORE_FILE", home.join("DB.json"));
    let logs_dir = env_or_default_path("APODICTIC_LOGS_DIR", home.join("logs"));

    Ok(IngestPaths {
        home,
        input_file,
        cleaned_file,
        store_file,
        logs_dir,
    })
}

impl IngestPaths {
    pub fn with_overrides(mut self, overrides: &PathOverrides) -> Self {
        if let Some(path) = &overrides.input_file {
            self.input_file = path.clone();
        }
        if let Some(path) = &overrides.cleaned_file {
            self.cleaned_file = path.clone();
        }
        if let Some(path) = &overrides.store_file {
            self.store_file = path.clone();
        }
        self
    }
}
