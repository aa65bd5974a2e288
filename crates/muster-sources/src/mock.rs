//! In-process source adapter for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use muster_core::{LookupQuery, LookupResult, RecordSource};

use crate::adapter::SourceAdapter;
use crate::error::SourceError;

#[derive(Debug, Clone)]
enum Behavior {
    Results(Vec<LookupResult>),
    /// Sleep, then answer.
    Slow(Duration, Vec<LookupResult>),
    Panic,
}

fn numbered(source: RecordSource, count: usize) -> Vec<LookupResult> {
    (0..count)
        .map(|n| LookupResult::new(source, format!("{source} match {n}")))
        .collect()
}

/// Adapter answering from a fixed script, counting calls.
#[derive(Debug)]
pub struct MockSourceAdapter {
    source: RecordSource,
    behavior: Mutex<Behavior>,
    calls: AtomicUsize,
}

impl MockSourceAdapter {
    /// Answers `count` results named `"{source} match {n}"`.
    pub fn with_results(source: RecordSource, count: usize) -> Self {
        Self::from_behavior(source, Behavior::Results(numbered(source, count)))
    }

    pub fn empty(source: RecordSource) -> Self {
        Self::with_results(source, 0)
    }

    /// Answers after `delay`.
    pub fn slow(source: RecordSource, delay: Duration, count: usize) -> Self {
        Self::from_behavior(source, Behavior::Slow(delay, numbered(source, count)))
    }

    /// Panics inside `search`.
    pub fn panicking(source: RecordSource) -> Self {
        Self::from_behavior(source, Behavior::Panic)
    }

    fn from_behavior(source: RecordSource, behavior: Behavior) -> Self {
        Self {
            source,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the answer for subsequent calls.
    pub fn set_results(&self, results: Vec<LookupResult>) {
        *self.behavior.lock() = Behavior::Results(results);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for MockSourceAdapter {
    fn source(&self) -> RecordSource {
        self.source
    }

    async fn search(&self, _query: &LookupQuery) -> Result<Vec<LookupResult>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().clone();
        match behavior {
            Behavior::Results(results) => Ok(results),
            Behavior::Slow(delay, results) => {
                tokio::time::sleep(delay).await;
                Ok(results)
            }
            Behavior::Panic => panic!("mock source {} panicked", self.source),
        }
    }
}
