use crate::error::IngestError;
use crate::ingest::salvage::{RepairStrategy, repair_with};
use crate::ingest::util::read_text_lossy;
use anyhow::Result;
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info};

/// Raw records pulled out of one ingestion input.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub records: Vec<Value>,
    /// True when the salvage repairer had to patch the payload.
    pub repaired: bool,
}

fn into_records(value: Value, what: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(IngestError::Payload(format!(
            "{what} must be a JSON array, found {}",
            kind_of(&other)
        ))
        .into()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Repair and parse the text of a payload field into raw records.
pub fn parse_payload(text: &str, strategy: RepairStrategy) -> Result<RawBatch> {
    let repaired = repair_with(text, strategy).map_err(IngestError::from)?;
    let patched = matches!(repaired, Cow::Owned(_));
    if patched {
        info!(
            strategy = strategy.as_str(),
            original_bytes = text.len(),
            repaired_bytes = repaired.len(),
            "payload was truncated; salvaged"
        );
    }
    let value: Value = serde_json::from_str(&repaired)
        .map_err(|err| IngestError::Payload(format!("repaired payload does not parse: {err}")))?;
    Ok(RawBatch {
        records: into_records(value, "payload")?,
        repaired: patched,
    })
}

/// Pull the payload string out of `{ "<field>": "<JSON array as a string>" }`.
pub fn read_payload_field(path: &Path, field: &str) -> Result<String> {
    let text = read_text_lossy(path)?;
    let outer: Value = serde_json::from_str(&text).map_err(|err| {
        IngestError::Payload(format!("{} is not a JSON document: {err}", path.display()))
    })?;
    let inner = match outer {
        Value::Object(mut obj) => obj.remove(field),
        _ => None,
    };
    match inner {
        Some(Value::String(inner)) => {
            debug!(path = %path.display(), field, bytes = inner.len(), "read ingestion input");
            Ok(inner)
        }
        Some(other) => Err(IngestError::Payload(format!(
            "field `{field}` in {} must be a string, found {}",
            path.display(),
            kind_of(&other)
        ))
        .into()),
        None => Err(IngestError::Payload(format!(
            "field `{field}` missing from {}",
            path.display()
        ))
        .into()),
    }
}

/// Read the normalized intermediate `{ "articles": [...] }` as raw records so
/// they pass through validation again.
pub fn read_intermediate(path: &Path) -> Result<Vec<Value>> {
    let text = read_text_lossy(path)?;
    let doc: Value = serde_json::from_str(&text).map_err(|err| {
        IngestError::Payload(format!("{} is not a JSON document: {err}", path.display()))
    })?;
    match doc {
        Value::Object(mut obj) => match obj.remove("articles") {
            Some(articles) => into_records(articles, "`articles`"),
            None => Err(IngestError::Payload(format!(
                "field `articles` missing from {}",
                path.display()
            ))
            .into()),
        },
        other => Err(IngestError::Payload(format!(
            "{} must hold an object, found {}",
            path.display(),
            kind_of(&other)
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_input(dir: &Path, inner: &str) -> std::path::PathBuf {
        let path = dir.join("ai-output.json");
        let outer = serde_json::json!({ "ai_response": inner });
        fs::write(&path, outer.to_string()).expect("write input");
        path
    }

    #[test]
    fn valid_payload_is_read_untouched() {
        let tmp = tempdir().expect("tempdir");
        let path = write_input(tmp.path(), r#"[{"id":"1"},{"id":"2"}]"#);
        let inner = read_payload_field(&path, "ai_response").expect("read");
        let batch = parse_payload(&inner, RepairStrategy::TailPatch).expect("parse");
        assert_eq!(batch.records.len(), 2);
        assert!(!batch.repaired);
    }

    #[test]
    fn truncated_payload_is_salvaged() {
        let tmp = tempdir().expect("tempdir");
        let path = write_input(
            tmp.path(),
            r#"[{"id":"1","content":"a"},{"id":"2","content":"b"},{"id":"3","content":"partial tex"#,
        );
        let inner = read_payload_field(&path, "ai_response").expect("read");
        let batch = parse_payload(&inner, RepairStrategy::TailPatch).expect("parse");
        assert!(batch.repaired);
        assert_eq!(batch.records[0]["id"], "1");
        assert_eq!(batch.records[1]["id"], "2");
    }

    #[test]
    fn missing_or_non_string_field_is_a_payload_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("ai-output.json");
        fs::write(&path, r#"{"other": "[]"}"#).expect("write");
        let err = read_payload_field(&path, "ai_response").expect_err("missing");
        assert!(err.to_string().contains("field `ai_response` missing"));

        fs::write(&path, r#"{"ai_response": [1, 2]}"#).expect("write");
        let err = read_payload_field(&path, "ai_response").expect_err("array");
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn payload_must_be_an_array() {
        let err = parse_payload(r#"{"id":"1"}"#, RepairStrategy::TailPatch).expect_err("object");
        assert!(err.to_string().contains("must be a JSON array, found an object"));
    }

    #[test]
    fn unsalvageable_payload_surfaces_the_repair_error() {
        let err = parse_payload(r#"[{"id":"1"} {"id":"2"}]"#, RepairStrategy::TailPatch)
            .expect_err("interior damage");
        assert!(err.downcast_ref::<IngestError>().is_some());
        assert!(err.to_string().contains("unrecoverable JSON"));
    }

    #[test]
    fn intermediate_articles_are_returned_raw() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("cleaned.json");
        fs::write(&path, r#"{"articles":[{"id":"1"},{"id":"2"}]}"#).expect("write");
        let records = read_intermediate(&path).expect("read");
        assert_eq!(records.len(), 2);

        fs::write(&path, r#"{"items":[]}"#).expect("write");
        assert!(read_intermediate(&path).is_err());
    }
}
