//! Army national cemetery explorer.
//!
//! `POST {base}/publicwmv/api/search` with
//! `{searchTerm, searchType: "all", page: 1, pageSize: 50}` → `{"results": [...]}`

use async_trait::async_trait;
use serde_json::{json, Value};

use muster_core::{LookupQuery, LookupResult, RecordSource};

use crate::adapter::{join_words, read_json, records, text, text_or_empty, transport, SourceAdapter};
use crate::error::SourceError;

const SOURCE: RecordSource = RecordSource::CemeteryExplorer;
const PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct CemeteryExplorerAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl CemeteryExplorerAdapter {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

fn request_body(query: &LookupQuery) -> Value {
    json!({
        "searchTerm": query.display(),
        "searchType": "all",
        "page": 1,
        "pageSize": PAGE_SIZE,
    })
}

pub fn parse_record(record: &Value) -> LookupResult {
    let parts = ["firstName", "middleName", "lastName"].map(|k| text_or_empty(record, k));
    let mut result = LookupResult::new(SOURCE, join_words(parts.iter().map(String::as_str)));
    result.branch = text(record, "branch");
    result.rank = text(record, "rank");
    result.birth_date = text(record, "birthDate");
    result.death_date = text(record, "deathDate");
    result.cemetery = text(record, "cemetery");
    result.location = text(record, "section");
    result.metadata = record.clone();
    result
}

pub fn parse_body(body: &Value) -> Vec<LookupResult> {
    records(body, "results").iter().map(parse_record).collect()
}

#[async_trait]
impl SourceAdapter for CemeteryExplorerAdapter {
    fn source(&self) -> RecordSource {
        SOURCE
    }

    async fn search(&self, query: &LookupQuery) -> Result<Vec<LookupResult>, SourceError> {
        let url = format!("{}/publicwmv/api/search", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&request_body(query))
            .send()
            .await
            .map_err(transport(SOURCE))?;
        let results = read_json(SOURCE, resp)
            .await
            .map(|body| parse_body(&body))
            .unwrap_or_default();
        tracing::debug!(source = %SOURCE, count = results.len(), "source search complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_joins_three_parts() {
        let r = parse_record(&json!({
            "firstName": "John",
            "middleName": "  ",
            "lastName": "Doe",
            "branch": "US ARMY",
            "cemetery": "Arlington National Cemetery",
            "section": "60"
        }));
        assert_eq!(r.name, "John Doe");
        assert_eq!(r.location.as_deref(), Some("60"));
        assert_eq!(r.cemetery.as_deref(), Some("Arlington National Cemetery"));
        assert!(r.service_dates.is_none());
    }

    #[test]
    fn body_uses_display_form() {
        let q = LookupQuery::new(Some("John"), Some("Doe")).unwrap();
        assert_eq!(request_body(&q)["searchTerm"], "John Doe");
        assert_eq!(request_body(&q)["searchType"], "all");
    }
}
