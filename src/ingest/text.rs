use chrono::DateTime;

/// Timestamp shape emitted by the feed stage, e.g. `Tue, 04 Jun 2024 09:30:00 +1000`.
const FEED_TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Collapse whitespace runs to one space, trim, and drop stray control
/// characters.
pub fn clean_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for word in input
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|w| !w.is_empty())
    {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// `YYYY-MM-DD` when `raw` is a feed timestamp, otherwise `raw` unchanged.
pub fn standardize_date(raw: &str) -> String {
    match DateTime::parse_from_str(raw.trim(), FEED_TIMESTAMP_FORMAT) {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}
