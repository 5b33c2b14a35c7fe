use crate::error::IngestError;
use crate::ingest::article::Store;
use crate::ingest::util::sha256_hex;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LoadedStore {
    pub store: Store,
    /// `None` when the store file does not exist yet.
    pub digest: Option<String>,
}

/// Exclusive advisory lock on `<store>.lock`, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

pub fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".lock");
    store_path.with_file_name(name)
}

pub fn lock_store(store_path: &Path) -> Result<StoreLock> {
    let dir = parent_dir(store_path);
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let path = lock_path(store_path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    if let Err(err) = FileExt::try_lock_exclusive(&file) {
        if err.kind() == fs2::lock_contended_error().kind() {
            return Err(IngestError::StoreLocked(path.display().to_string()).into());
        }
        return Err(err).with_context(|| format!("failed to lock {}", path.display()));
    }
    debug!(lock = %path.display(), "store lock acquired");
    Ok(StoreLock { _file: file, path })
}

/// A missing store is an empty store. An unreadable, non-UTF-8 or
/// unparseable one is an error so it is never rewritten from a partial view.
pub fn load(path: &Path) -> Result<LoadedStore> {
    if !path.exists() {
        return Ok(LoadedStore {
            store: Store::default(),
            digest: None,
        });
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = String::from_utf8(bytes).map_err(|err| {
        IngestError::Payload(format!(
            "store {} is not valid UTF-8 (byte {})",
            path.display(),
            err.utf8_error().valid_up_to()
        ))
    })?;
    let store: Store = serde_json::from_str(&text).map_err(|err| {
        IngestError::Payload(format!(
            "store {} is not a valid article document: {err}",
            path.display()
        ))
    })?;
    Ok(LoadedStore {
        store,
        digest: Some(sha256_hex(text.as_bytes())),
    })
}

/// Four-space indent, non-ASCII kept verbatim, trailing newline.
pub fn to_pretty_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

/// Write to a temp file beside `path`, fsync, then rename over `path`. The
/// temp file is removed if anything fails before the rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<String> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let bytes = to_pretty_bytes(value)?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(&bytes)
        .with_context(|| format!("failed to write {}", tmp.path().display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to sync {}", tmp.path().display()))?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .with_context(|| format!("failed to copy permissions of {}", path.display()))?;
    }
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(sha256_hex(&bytes))
}

pub fn save(path: &Path, store: &Store) -> Result<String> {
    write_json_atomic(path, store)
}
