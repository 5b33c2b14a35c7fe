//! Best-effort recovery of a JSON payload that was cut off mid-generation.
//!
//! The baseline (`tail-patch`) assumes a single top-level array of objects
//! truncated at exactly one point near its end. Anything else fails closed
//! with a [`RepairError`] rather than guessing at structure.

use crate::error::RepairError;
use crate::ingest::util::excerpt_around;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::borrow::Cow;
use std::str::FromStr;

const EXCERPT_RADIUS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RepairStrategy {
    /// Cut at the failure position, close the string and the last object.
    #[default]
    TailPatch,
    /// Track nesting and close every open scope at end of input.
    CloseScopes,
}

impl RepairStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TailPatch => "tail-patch",
            Self::CloseScopes => "close-scopes",
        }
    }
}

impl FromStr for RepairStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tail-patch" | "tail_patch" => Ok(Self::TailPatch),
            "close-scopes" | "close_scopes" => Ok(Self::CloseScopes),
            other => Err(format!(
                "unknown repair strategy `{other}`; use `tail-patch` or `close-scopes`"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureClass {
    UnterminatedString,
    MissingDelimiter,
    Other,
}

#[derive(Debug)]
struct ParseFailure {
    class: FailureClass,
    eof: bool,
    reason: String,
    line: usize,
    column: usize,
    offset: usize,
}

impl ParseFailure {
    fn from_serde(raw: &str, err: &serde_json::Error) -> Self {
        let message = err.to_string();
        let reason = match message.rsplit_once(" at line ") {
            Some((head, _)) => head.to_string(),
            None => message.clone(),
        };
        let class = if reason.starts_with("EOF while parsing a string") {
            FailureClass::UnterminatedString
        } else if reason.starts_with("expected `,` or") {
            FailureClass::MissingDelimiter
        } else {
            FailureClass::Other
        };
        let eof = err.classify() == Category::Eof;
        let (line, column) = (err.line(), err.column());
        Self {
            class,
            eof,
            reason,
            line,
            column,
            offset: byte_offset(raw, line, column, eof),
        }
    }

    fn into_error(self, raw: &str) -> RepairError {
        RepairError {
            excerpt: excerpt_around(raw, self.offset, EXCERPT_RADIUS),
            reason: self.reason,
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }
}

/// serde_json reports the column one past the offending byte for syntax
/// errors and the input length for end-of-input errors.
fn byte_offset(raw: &str, line: usize, column: usize, eof: bool) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        raw.match_indices('\n')
            .nth(line - 2)
            .map(|(i, _)| i + 1)
            .unwrap_or(raw.len())
    };
    let mut offset = line_start + column;
    if !eof {
        offset = offset.saturating_sub(1);
    }
    let mut offset = offset.min(raw.len());
    while !raw.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn parse_check(text: &str) -> Result<(), serde_json::Error> {
    serde_json::from_str::<IgnoredAny>(text).map(|_| ())
}

/// Repair with the baseline strategy.
pub fn repair(raw: &str) -> Result<Cow<'_, str>, RepairError> {
    repair_with(raw, RepairStrategy::TailPatch)
}

/// Return `raw` untouched when it already parses, otherwise a patched copy
/// that parses, otherwise the original failure.
pub fn repair_with(raw: &str, strategy: RepairStrategy) -> Result<Cow<'_, str>, RepairError> {
    let err = match parse_check(raw) {
        Ok(()) => return Ok(Cow::Borrowed(raw)),
        Err(err) => err,
    };
    let failure = ParseFailure::from_serde(raw, &err);

    let candidate = match (strategy, failure.eof) {
        (RepairStrategy::CloseScopes, true) => close_scopes(raw),
        _ => match failure.class {
            FailureClass::UnterminatedString | FailureClass::MissingDelimiter => {
                Some(tail_patch(raw, failure.offset))
            }
            FailureClass::Other => None,
        },
    };

    match candidate {
        Some(patched) if parse_check(&patched).is_ok() => Ok(Cow::Owned(patched)),
        _ => Err(failure.into_error(raw)),
    }
}

#[derive(Debug, Default)]
struct StringScan {
    in_string: bool,
    escaped: bool,
}

fn scan_strings(text: &str) -> StringScan {
    let mut scan = StringScan::default();
    for ch in text.chars() {
        if scan.in_string {
            if scan.escaped {
                scan.escaped = false;
            } else if ch == '\\' {
                scan.escaped = true;
            } else if ch == '"' {
                scan.in_string = false;
            }
        } else if ch == '"' {
            scan.in_string = true;
        }
    }
    scan
}

fn tail_patch(raw: &str, offset: usize) -> String {
    let cut = &raw[..offset];
    let scan = scan_strings(cut);

    let mut patched = if scan.in_string {
        let mut s = cut.to_string();
        if scan.escaped {
            s.pop();
        }
        s.push('"');
        s
    } else {
        cut.trim_end().to_string()
    };
    patched.push('}');

    // A `]` inside the unterminated string is text, not the array closing.
    if scan.in_string || !raw.trim_end().ends_with(']') {
        let kept = patched.trim_end_matches(|c: char| c == '}' || c.is_whitespace()).len();
        patched.truncate(kept);
        patched.push_str("}]");
    }
    patched
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Array,
    Object { awaiting_key: bool },
}

impl Frame {
    fn closer(self) -> char {
        match self {
            Frame::Array => ']',
            Frame::Object { .. } => '}',
        }
    }
}

fn closers(frames: &[Frame]) -> String {
    frames.iter().rev().map(|f| f.closer()).collect()
}

/// Drop a trailing backslash or an incomplete `\uXXXX` escape.
fn strip_partial_escape(text: &str) -> &str {
    let Some(slash) = text.rfind('\\') else {
        return text;
    };
    let run = text[..=slash].chars().rev().take_while(|c| *c == '\\').count();
    if run % 2 == 0 {
        return text;
    }
    let tail = &text[slash + 1..];
    let partial_unicode = tail.starts_with('u')
        && tail.len() < 5
        && tail[1..].chars().all(|c| c.is_ascii_hexdigit());
    if tail.is_empty() || partial_unicode {
        &text[..slash]
    } else {
        text
    }
}

/// Only meaningful for end-of-input failures: everything before the end is
/// syntactically valid, so the last complete value is a sound cut point.
fn close_scopes(raw: &str) -> Option<String> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut string_is_key = false;
    let mut last_safe: Option<(usize, Vec<Frame>)> = None;

    for (i, ch) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    in_string = false;
                    if string_is_key {
                        if let Some(Frame::Object { awaiting_key }) = stack.last_mut() {
                            *awaiting_key = false;
                        }
                    } else {
                        last_safe = Some((i + 1, stack.clone()));
                    }
                }
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                string_is_key = matches!(stack.last(), Some(Frame::Object { awaiting_key: true }));
            }
            '{' => {
                stack.push(Frame::Object { awaiting_key: true });
                last_safe = Some((i + 1, stack.clone()));
            }
            '[' => {
                stack.push(Frame::Array);
                last_safe = Some((i + 1, stack.clone()));
            }
            '}' | ']' => {
                stack.pop();
                last_safe = Some((i + 1, stack.clone()));
            }
            ',' => {
                last_safe = Some((i, stack.clone()));
                if let Some(Frame::Object { awaiting_key }) = stack.last_mut() {
                    *awaiting_key = true;
                }
            }
            _ => {}
        }
    }

    if in_string && !string_is_key {
        let mut out = strip_partial_escape(raw).to_string();
        out.push('"');
        out.push_str(&closers(&stack));
        return Some(out);
    }

    let (pos, frames) = last_safe?;
    let mut out = raw[..pos].trim_end().to_string();
    out.push_str(&closers(&frames));
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const TWO_COMPLETE: &str = r#"[{"id":"1","content":"first body"},{"id":"2","content":"second body"}"#;

    fn parse(text: &str) -> Vec<Value> {
        serde_json::from_str::<Vec<Value>>(text).expect("repaired text parses as array")
    }

    #[test]
    fn valid_json_is_returned_unchanged() {
        let raw = r#"[{"id":"1","content":"x"}]"#;
        let out = repair(raw).expect("valid");
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, raw);

        let spaced = "  {\"a\": [1, 2, 3]}\n";
        assert_eq!(repair(spaced).expect("valid"), spaced);
    }

    #[test]
    fn truncated_string_in_last_element_is_closed() {
        let raw = format!(r#"{TWO_COMPLETE},{{"id":"3","content":"partial tex"#);
        let out = repair(&raw).expect("recoverable");
        let items = parse(&out);

        assert!(items.len() >= 2);
        assert_eq!(items[0]["id"], "1");
        assert_eq!(items[1]["content"], "second body");
        assert_eq!(items[2]["content"], "partial tex");
    }

    #[test]
    fn bracket_at_end_of_truncated_string_is_not_the_array_close() {
        let raw = r#"[{"id":"1","content":"first body"},{"id":"2","content":"see note [1]"#;
        let items = parse(&repair(raw).expect("recoverable"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["content"], "see note [1]");
    }

    #[test]
    fn truncation_right_after_open_quote_closes_empty_string() {
        let raw = format!(r#"{TWO_COMPLETE},{{"id":"3","content":""#);
        let items = parse(&repair(&raw).expect("recoverable"));
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["content"], "");
    }

    #[test]
    fn missing_delimiter_keeps_the_complete_prefix() {
        let raw = r#"[{"id":"1","content":"ok"} {"id":"2","content":"lost"#;
        let items = parse(&repair(raw).expect("recoverable"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["content"], "ok");
    }

    #[test]
    fn nested_truncation_fails_closed() {
        let raw = r#"[{"id":"1","content":"c","dot_points":["one","tw"#;
        let err = repair(raw).expect_err("two open scopes cannot be patched");
        assert_eq!(err.offset, raw.len());
        assert!(err.reason.contains("EOF while parsing a string"));
    }

    #[test]
    fn interior_malformation_fails_closed() {
        let raw = r#"[{"id":"1","content":tru},{"id":"2","content":"x"}]"#;
        let err = repair(raw).expect_err("not a truncation");
        assert_eq!(err.line, 1);
        assert!(err.offset < raw.len());
    }

    #[test]
    fn error_excerpt_is_bounded_around_failure() {
        let filler = "x".repeat(300);
        let raw = format!(r#"[{{"id":"1","content":"{filler}","dot_points":["a","b"#);
        let err = repair(&raw).expect_err("nested");
        assert!(err.excerpt.chars().count() <= 2 * EXCERPT_RADIUS);
        assert!(err.excerpt.ends_with("\"a\",\"b"));
        let rendered = err.to_string();
        assert!(rendered.contains("line 1"));
    }

    #[test]
    fn multi_line_offsets_point_at_the_failure() {
        let raw = "[\n  {\"id\": \"1\"}\n  {\"id\": \"2\"}\n]";
        let err = repair(raw).expect_err("object after closing bracket line");
        assert_eq!(err.line, 3);
        assert_eq!(&raw[err.offset..err.offset + 1], "{");
    }

    #[test]
    fn close_scopes_recovers_truncation_outside_strings() {
        let raw = format!(r#"{TWO_COMPLETE},{{"id":"3","content":"#);
        assert!(repair(&raw).is_err());

        let out = repair_with(&raw, RepairStrategy::CloseScopes).expect("recoverable");
        let items = parse(&out);
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["id"], "3");
        assert!(items[2].get("content").is_none());
    }

    #[test]
    fn close_scopes_closes_nested_value_strings() {
        let raw = r#"[{"id":"1","content":"c","dot_points":["one","tw"#;
        let items = parse(&repair_with(raw, RepairStrategy::CloseScopes).expect("recoverable"));
        assert_eq!(items[0]["dot_points"][1], "tw");
    }

    #[test]
    fn close_scopes_drops_truncated_keys_and_scalars() {
        let raw = r#"[{"id":"1","count":12,"con"#;
        let items = parse(&repair_with(raw, RepairStrategy::CloseScopes).expect("recoverable"));
        assert_eq!(items[0]["count"], 12);
        assert!(items[0].get("con").is_none());

        let raw = r#"[{"id":"1","count":12"#;
        let items = parse(&repair_with(raw, RepairStrategy::CloseScopes).expect("recoverable"));
        assert!(items[0].get("count").is_none());
    }

    #[test]
    fn close_scopes_drops_dangling_escapes() {
        let raw = r#"[{"content":"line\"#;
        let items = parse(&repair_with(raw, RepairStrategy::CloseScopes).expect("recoverable"));
        assert_eq!(items[0]["content"], "line");

        let raw = r#"[{"content":"caf\u00e"#;
        let items = parse(&repair_with(raw, RepairStrategy::CloseScopes).expect("recoverable"));
        assert_eq!(items[0]["content"], "caf");
    }

    #[test]
    fn close_scopes_still_fails_closed_on_interior_errors() {
        let raw = r#"[{"id":"1","content":tru},{"id":"2"}]"#;
        assert!(repair_with(raw, RepairStrategy::CloseScopes).is_err());
    }

    #[test]
    fn strategy_parses_from_config_strings() {
        assert_eq!(
            "close-scopes".parse::<RepairStrategy>(),
            Ok(RepairStrategy::CloseScopes)
        );
        assert_eq!(
            "TAIL_PATCH".parse::<RepairStrategy>(),
            Ok(RepairStrategy::TailPatch)
        );
        assert!("magic".parse::<RepairStrategy>().is_err());
    }
}
