//! Per-request correlation headers.
//!
//! Every outbound provider request carries a fresh W3C `traceparent` and an
//! `x-request-id`, so individual calls can be matched against provider-side
//! logs. Generation is pure and stateless.

use rand::Rng;
use uuid::Uuid;

pub const TRACEPARENT: &str = "traceparent";
pub const REQUEST_ID: &str = "x-request-id";

/// One set of correlation headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    /// 32 lowercase hex characters, never all zeros.
    pub trace_id: String,
    /// 16 lowercase hex characters, never all zeros.
    pub span_id: String,
    pub request_id: Uuid,
}

impl RequestHeaders {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: format!("{:032x}", rng.gen_range(1..=u128::MAX)),
            span_id: format!("{:016x}", rng.gen_range(1..=u64::MAX)),
            request_id: Uuid::new_v4(),
        }
    }

    /// `00-{trace_id}-{span_id}-01` (version 00, sampled).
    pub fn traceparent(&self) -> String {
        format!("00-{}-{}-01", self.trace_id, self.span_id)
    }

    pub fn pairs(&self) -> [(&'static str, String); 2] {
        [
            (TRACEPARENT, self.traceparent()),
            (REQUEST_ID, self.request_id.to_string()),
        ]
    }

    pub fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.pairs()
            .into_iter()
            .fold(builder, |b, (name, value)| b.header(name, value))
    }
}
