//! National gravesite locator.
//!
//! `GET {base}/ngl/search?firstName=&lastName=&state=` → `{"results": [...]}`

use async_trait::async_trait;
use serde_json::Value;

use muster_core::{LookupQuery, LookupResult, RecordSource};

use crate::adapter::{join_words, read_json, records, text, text_or_empty, transport, trim_separators, SourceAdapter};
use crate::error::SourceError;

const SOURCE: RecordSource = RecordSource::GraveLocator;

#[derive(Debug, Clone)]
pub struct GraveLocatorAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl GraveLocatorAdapter {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

/// Query parameters; absent parts are omitted.
fn params(query: &LookupQuery) -> Vec<(&'static str, String)> {
    [
        ("firstName", query.first_name()),
        ("lastName", query.last_name()),
        ("state", query.state()),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.map(|v| (k, v.to_string())))
    .collect()
}

/// Map one raw record.
pub fn parse_record(record: &Value) -> LookupResult {
    let first = text_or_empty(record, "firstName");
    let last = text_or_empty(record, "lastName");
    let mut result = LookupResult::new(SOURCE, join_words([first.as_str(), last.as_str()]));
    result.branch = text(record, "branchOfService");
    result.rank = text(record, "rank");
    result.birth_date = text(record, "birthDate");
    result.death_date = text(record, "deathDate");
    result.cemetery = text(record, "cemeteryName");
    result.location = trim_separators(
        &format!(
            "{}, {}",
            text_or_empty(record, "cemeteryCity"),
            text_or_empty(record, "cemeteryState")
        ),
        &[',', ' '],
    );
    result.service_dates = text(record, "serviceDates");
    result.metadata = record.clone();
    result
}

pub fn parse_body(body: &Value) -> Vec<LookupResult> {
    records(body, "results").iter().map(parse_record).collect()
}

#[async_trait]
impl SourceAdapter for GraveLocatorAdapter {
    fn source(&self) -> RecordSource {
        SOURCE
    }

    async fn search(&self, query: &LookupQuery) -> Result<Vec<LookupResult>, SourceError> {
        let url = format!("{}/ngl/search", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&params(query))
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
    use serde_json::json;

    #[test]
    fn maps_fields_and_location() {
        let body = json!({"results": [{
            "firstName": "John",
            "lastName": "Doe",
            "branchOfService": "ARMY",
            "rank": "PFC",
            "birthDate": "1920-01-01",
            "deathDate": "1944-06-06",
            "cemeteryName": "Normandy American Cemetery",
            "cemeteryCity": "Colleville",
            "cemeteryState": "FR",
            "serviceDates": "1942 - 1944"
        }]});
        let results = parse_body(&body);
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.source, RecordSource::GraveLocator);
        assert_eq!(r.name, "John Doe");
        assert_eq!(r.location.as_deref(), Some("Colleville, FR"));
        assert_eq!(r.service_dates.as_deref(), Some("1942 - 1944"));
        assert_eq!(r.metadata["cemeteryState"], "FR");
        assert!(r.awards.is_none());
    }

    #[test]
    fn partial_location_is_trimmed() {
        let r = parse_record(&json!({"lastName": "Doe", "cemeteryState": "VA"}));
        assert_eq!(r.name, "Doe");
        assert_eq!(r.location.as_deref(), Some("VA"));
        let r = parse_record(&json!({"lastName": "Doe"}));
        assert_eq!(r.location, None);
    }

    #[test]
    fn params_skip_missing_parts() {
        let q = LookupQuery::new(None, Some("Doe")).unwrap().with_state(Some("va"));
        assert_eq!(
            params(&q),
            vec![("lastName", "Doe".to_string()), ("state", "VA".to_string())]
        );
    }
}
