use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Truncate `input` to at most `max_chars` Unicode characters, stripping
/// control characters and appending `…` when truncated.
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    let clean: String = input.chars().filter(|c| !c.is_control()).collect();
    if clean.chars().count() > max_chars {
        let mut s: String = clean.chars().take(max_chars).collect();
        s.push('…');
        s
    } else {
        clean
    }
}

/// Up to `radius` characters either side of byte `offset`, never splitting a
/// UTF-8 sequence.
pub fn excerpt_around(input: &str, offset: usize, radius: usize) -> String {
    let mut pivot = offset.min(input.len());
    while !input.is_char_boundary(pivot) {
        pivot -= 1;
    }
    let before: Vec<char> = input[..pivot].chars().rev().take(radius).collect();
    let after = input[pivot..].chars().take(radius);
    before.into_iter().rev().chain(after).collect()
}

/// Read a file as text, replacing byte sequences that are not UTF-8.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            warn!(
                path = %path.display(),
                valid_up_to = err.utf8_error().valid_up_to(),
                "input is not valid UTF-8; replacing undecodable bytes"
            );
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_is_bounded_on_both_sides() {
        let text = "0123456789abcdefghij";
        assert_eq!(excerpt_around(text, 10, 3), "789abc");
        assert_eq!(excerpt_around(text, 0, 3), "012");
        assert_eq!(excerpt_around(text, 99, 3), "hij");
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = "añb";
        // byte 2 sits inside the two-byte `ñ`
        assert_eq!(excerpt_around(text, 2, 1), "añ");
    }

    #[test]
    fn lossy_read_replaces_invalid_bytes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("payload.json");
        fs::write(&path, b"{\"a\":\"caf\xe9\"}").expect("write");
        let text = read_text_lossy(&path).expect("read");
        assert_eq!(text, "{\"a\":\"caf\u{fffd}\"}");
    }

    #[test]
    fn truncate_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a longer title", 8), "a longer…");
    }
}
