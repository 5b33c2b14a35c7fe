use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "APODICTIC_";

fn rust_sources(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                found.push(path);
            }
        }
    }
    Ok(found)
}

/// Every `APODICTIC_<NAME>` token, where the name is upper-case ASCII,
/// digits or underscores. A bare prefix (as in `APODICTIC_*`) is ignored.
fn env_keys_in(source: &str) -> impl Iterator<Item = &str> {
    source.match_indices(ENV_PREFIX).filter_map(move |(start, _)| {
        let rest = &source[start + ENV_PREFIX.len()..];
        let name_len = rest
            .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
            .unwrap_or(rest.len());
        (name_len > 0).then(|| &source[start..start + ENV_PREFIX.len() + name_len])
    })
}

fn render_allowlist(keys: &BTreeSet<String>) -> String {
    let entries: String = keys.iter().map(|key| format!("    \"{key}\",\n")).collect();
    format!("pub const GENERATED_ENV_ALLOWLIST: &[&str] = &[\n{entries}];\n")
}

fn main() {
    let sources = rust_sources(Path::new("src")).expect("failed to list src/");
    let keys: BTreeSet<String> = sources
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .flat_map(|text| env_keys_in(&text).map(str::to_owned).collect::<Vec<_>>())
        .collect();

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(
        Path::new(&out_dir).join("env_allowlist.rs"),
        render_allowlist(&keys),
    )
    .expect("failed to write env allowlist");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
