use std::env;
use std::path::PathBuf;

include!(concat!(env!("OUT_DIR"), "/env_allowlist.rs"));

fn fallback_dotenv_path(app_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    let base = app_home.or(home_dir)?;
    Some(base.join("apodictic/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("APODICTIC_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

/// Every `APODICTIC_*` variable the binary reads that is currently set.
pub fn active_overrides() -> Vec<(String, String)> {
    GENERATED_ENV_ALLOWLIST
        .iter()
        .filter_map(|key| {
            let value = env::var(key).ok()?;
            if value.trim().is_empty() {
                return None;
            }
            Some(((*key).to_string(), value))
        })
        .collect()
}
