//! Veterans legacy memorial.
//!
//! `POST {base}/SEARCH/SearchVeterans` with
//! `{veteranName, branch, page: 1, pageSize: 50}` → `{"veterans": [...]}`

use async_trait::async_trait;
use serde_json::{json, Value};

use muster_core::{LookupQuery, LookupResult, RecordSource};

use crate::adapter::{read_json, records, text, text_or_empty, transport, trim_separators, SourceAdapter};
use crate::error::SourceError;

const SOURCE: RecordSource = RecordSource::LegacyMemorial;
const PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct LegacyMemorialAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl LegacyMemorialAdapter {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

fn request_body(query: &LookupQuery) -> Value {
    json!({
        "veteranName": query.display(),
        "branch": query.branch().map(|b| b.display_name()).unwrap_or_default(),
        "page": 1,
        "pageSize": PAGE_SIZE,
    })
}

fn awards(record: &Value) -> Vec<String> {
    record
        .get("awards")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_record(record: &Value) -> LookupResult {
    let mut result = LookupResult::new(SOURCE, text_or_empty(record, "veteranName"));
    result.branch = text(record, "branchOfService");
    result.rank = text(record, "rank");
    result.birth_date = text(record, "birthYear");
    result.death_date = text(record, "deathYear");
    result.cemetery = text(record, "cemeteryName");
    result.location = text(record, "cemeteryLocation");
    result.service_dates = trim_separators(
        &format!(
            "{} - {}",
            text_or_empty(record, "serviceStartDate"),
            text_or_empty(record, "serviceEndDate")
        ),
        &[' ', '-'],
    );
    result.awards = Some(awards(record));
    result.metadata = record.clone();
    result
}

pub fn parse_body(body: &Value) -> Vec<LookupResult> {
    records(body, "veterans").iter().map(parse_record).collect()
}

#[async_trait]
impl SourceAdapter for LegacyMemorialAdapter {
    fn source(&self) -> RecordSource {
        SOURCE
    }

    async fn search(&self, query: &LookupQuery) -> Result<Vec<LookupResult>, SourceError> {
        let url = format!("{}/SEARCH/SearchVeterans", self.base_url);
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
