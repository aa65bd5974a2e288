//! # Source Adapter Interface
//!
//! One [`SourceAdapter`] per public-record endpoint. Adapters make a single
//! attempt per search: freshness is best effort, and the aggregator turns
//! any failure into an empty result set for that source.
//!
//! Response handling shared by every adapter:
//!
//! - non-2xx status → `Ok(vec![])`, logged at `error!`;
//! - `content-type` not starting with `application/json`, or a body that
//!   does not parse → `Ok(vec![])`, logged at `error!`;
//! - transport failure → `Err(SourceError::Transport)`.

use async_trait::async_trait;
use serde_json::Value;

use muster_core::{LookupQuery, LookupResult, RecordSource};

use crate::error::SourceError;

/// A public-record search endpoint.
///
/// Implementations must be `Send + Sync`; the aggregator shares them across
/// spawned tasks behind an `Arc`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> RecordSource;

    async fn search(&self, query: &LookupQuery) -> Result<Vec<LookupResult>, SourceError>;
}

/// Decode a JSON body, or `None` after logging why it was unusable.
pub(crate) async fn read_json(source: RecordSource, resp: reqwest::Response) -> Option<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::error!(%source, status = status.as_u16(), body = %truncate(&body, 200), "source returned error status");
        return None;
    }

    let is_json = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        tracing::error!(%source, "source returned a non-JSON body");
        return None;
    }

    match resp.json::<Value>().await {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::error!(%source, "failed to decode source response: {e}");
            None
        }
    }
}

/// Array under `key`, or empty.
pub(crate) fn records<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// String or number field as text. Blank strings count as absent.
pub(crate) fn text(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Field as text, or `""`.
pub(crate) fn text_or_empty(record: &Value, key: &str) -> String {
    text(record, key).unwrap_or_default()
}

/// Join parts with single spaces, skipping blanks.
pub(crate) fn join_words<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip `chars` from both ends; `None` if nothing remains.
pub(crate) fn trim_separators(raw: &str, chars: &[char]) -> Option<String> {
    let trimmed = raw.trim_matches(|c| chars.contains(&c));
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub(crate) fn transport(source: RecordSource) -> impl FnOnce(reqwest::Error) -> SourceError {
    move |error| SourceError::Transport { id: source, error }
}
