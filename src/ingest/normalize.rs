use crate::error::ValidationError;
use crate::ingest::article::{Article, CATEGORY_BUSINESS, CATEGORY_FINANCIAL, Quote, Source};
use crate::ingest::config::NormalizeRules;
use crate::ingest::text::{clean_text, standardize_date};
use crate::ingest::util::truncate_with_ellipsis;
use serde_json::{Map, Value};
use tracing::warn;
use url::Url;
use uuid::Uuid;

const RECORD_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone)]
pub struct Rejection {
    pub index: usize,
    pub error: ValidationError,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub articles: Vec<Article>,
    pub rejected: Vec<Rejection>,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(obj: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(clean_text(s)),
        Some(_) => Err(ValidationError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

fn optional_text(obj: &Map<String, Value>, field: &str) -> String {
    obj.get(field)
        .and_then(scalar_text)
        .map(|s| clean_text(&s))
        .unwrap_or_default()
}

fn object_entries<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    obj.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

pub fn classify(content: &str, rules: &NormalizeRules) -> &'static str {
    let folded = content.to_lowercase();
    if rules
        .finance_keywords
        .iter()
        .any(|keyword| folded.contains(keyword.as_str()))
    {
        CATEGORY_FINANCIAL
    } else {
        CATEGORY_BUSINESS
    }
}

/// A source URL must carry a scheme and a host, and the host must not be a
/// link shortener.
pub fn is_valid_source_url(raw: &str, shortlink_hosts: &[String]) -> bool {
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };
    match parsed.host_str() {
        Some(host) if !host.is_empty() => !shortlink_hosts
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(host)),
        _ => false,
    }
}

pub fn normalize(raw: &Value, rules: &NormalizeRules) -> Result<Article, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let dot_points: Vec<String> = match obj.get("dot_points") {
        None | Some(Value::Null) => return Err(ValidationError::MissingField("dot_points")),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(clean_text)
            .collect(),
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "dot_points",
                expected: "an array of strings",
            });
        }
    };
    let lead = required_text(obj, "lead")?;
    let content = required_text(obj, "content")?;
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }

    let title = dot_points.first().cloned().unwrap_or_else(|| lead.clone());
    let category = classify(&content, rules).to_string();

    let id = optional_text(obj, "id");
    let id = if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    };

    let date = obj
        .get("date")
        .and_then(scalar_text)
        .map(|d| standardize_date(&d))
        .unwrap_or_default();

    let sources = object_entries(obj, "sources")
        .map(|source| Source {
            title: optional_text(source, "title"),
            url: optional_text(source, "url"),
        })
        .filter(|source| is_valid_source_url(&source.url, &rules.shortlink_hosts))
        .collect();

    let quotes = object_entries(obj, "quotes")
        .map(|quote| Quote {
            text: optional_text(quote, "text"),
            speaker: optional_text(quote, "speaker"),
        })
        .collect();

    Ok(Article {
        title,
        content,
        category,
        id,
        date,
        lead,
        image: optional_text(obj, "image"),
        dot_points,
        sources,
        quotes,
    })
}

/// Normalize every record, keeping input order; rejections are logged and
/// collected, never fatal.
pub fn normalize_all(records: &[Value], rules: &NormalizeRules) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for (index, record) in records.iter().enumerate() {
        match normalize(record, rules) {
            Ok(article) => batch.articles.push(article),
            Err(error) => {
                warn!(
                    index,
                    %error,
                    record = %truncate_with_ellipsis(&record.to_string(), RECORD_PREVIEW_CHARS),
                    "skipping invalid record"
                );
                batch.rejected.push(Rejection { index, error });
            }
        }
    }
    batch
}
