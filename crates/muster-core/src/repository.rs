//! # Repository Interface
//!
//! The narrow persistence surface the engine consumes: sessions, personal
//! records and lookup-cache rows. Concrete stores (SQL, hosted document
//! stores, ...) live outside this workspace; [`InMemoryRepository`] backs
//! tests and single-process deployments.
//!
//! Every failure is reported as [`RepositoryError`]. Callers treat
//! `Unavailable` as a degraded, non-fatal condition.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::lookup::{CacheEntry, LookupResult, RecordSource};
use crate::record::PersonalRecord;
use crate::session::{ServiceKind, SessionUpdate, VerificationSession};
use crate::status::VerificationStatus;

/// Persistence failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store could not be reached or refused the operation.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// An update targeted a row that does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
}

/// Optional filters for [`Repository::list_sessions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub status: Option<VerificationStatus>,
    pub service_kind: Option<ServiceKind>,
}

impl SessionFilter {
    pub fn matches(&self, session: &VerificationSession) -> bool {
        self.status.map_or(true, |s| session.status == s)
            && self.service_kind.map_or(true, |k| session.service_kind == k)
    }
}

/// Persistence operations used by the driver and the lookup cache.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// behind an `Arc` by every request handler.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_session(&self, id: Uuid) -> Result<Option<VerificationSession>, RepositoryError>;

    async fn create_session(&self, session: &VerificationSession) -> Result<(), RepositoryError>;

    /// Apply a partial update and return the stored result.
    async fn update_session(
        &self,
        id: Uuid,
        update: &SessionUpdate,
    ) -> Result<VerificationSession, RepositoryError>;

    /// Sessions matching `filter`, newest first.
    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<VerificationSession>, RepositoryError>;

    async fn get_record(&self, id: Uuid) -> Result<Option<PersonalRecord>, RepositoryError>;

    async fn create_record(&self, record: &PersonalRecord) -> Result<(), RepositoryError>;

    /// Stored cache row, whether or not it has expired.
    async fn get_cache(
        &self,
        source: RecordSource,
        query_key: &str,
    ) -> Result<Option<CacheEntry>, RepositoryError>;

    /// Upsert a cache row living for `ttl` from now.
    async fn put_cache(
        &self,
        source: RecordSource,
        query_key: &str,
        results: &[LookupResult],
        ttl: Duration,
    ) -> Result<(), RepositoryError>;
}

/// Expiry instant `ttl` after `now`, saturating at the maximum timestamp.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ─── In-memory implementation ────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<Uuid, VerificationSession>,
    records: HashMap<Uuid, PersonalRecord>,
    cache: HashMap<(RecordSource, String), CacheEntry>,
}

#[derive(Debug)]
struct Inner {
    tables: RwLock<Tables>,
    available: AtomicBool,
    writes: AtomicUsize,
}

/// Thread-safe, cloneable in-memory repository.
///
/// All clones share the same tables. Locks are `parking_lot` and never held
/// across an `.await`. [`set_available`](Self::set_available) simulates an
/// outage: every call then fails with `Unavailable`.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    inner: Arc<Inner>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                available: AtomicBool::new(true),
                writes: AtomicUsize::new(0),
            }),
        }
    }

    /// Toggle simulated availability.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful write operations so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn session_count(&self) -> usize {
        self.inner.tables.read().sessions.len()
    }

    pub fn record_count(&self) -> usize {
        self.inner.tables.read().records.len()
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable("in-memory repository offline".into()))
        }
    }

    fn wrote(&self) {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_session(&self, id: Uuid) -> Result<Option<VerificationSession>, RepositoryError> {
        self.ensure_available()?;
        Ok(self.inner.tables.read().sessions.get(&id).cloned())
    }

    async fn create_session(&self, session: &VerificationSession) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        self.inner
            .tables
            .write()
            .sessions
            .insert(session.session_id, session.clone());
        self.wrote();
        Ok(())
    }

    async fn update_session(
        &self,
        id: Uuid,
        update: &SessionUpdate,
    ) -> Result<VerificationSession, RepositoryError> {
        self.ensure_available()?;
        let updated = {
            let mut tables = self.inner.tables.write();
            let session = tables
                .sessions
                .get_mut(&id)
                .ok_or(RepositoryError::NotFound { kind: "session", id })?;
            update.apply(session);
            session.clone()
        };
        self.wrote();
        Ok(updated)
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<VerificationSession>, RepositoryError> {
        self.ensure_available()?;
        let mut sessions: Vec<VerificationSession> = self
            .inner
            .tables
            .read()
            .sessions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(sessions)
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<PersonalRecord>, RepositoryError> {
        self.ensure_available()?;
        Ok(self.inner.tables.read().records.get(&id).cloned())
    }

    async fn create_record(&self, record: &PersonalRecord) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        self.inner
            .tables
            .write()
            .records
            .insert(record.record_id, record.clone());
        self.wrote();
        Ok(())
    }

    async fn get_cache(
        &self,
        source: RecordSource,
        query_key: &str,
    ) -> Result<Option<CacheEntry>, RepositoryError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .tables
            .read()
            .cache
            .get(&(source, query_key.to_string()))
            .cloned())
    }

    async fn put_cache(
        &self,
        source: RecordSource,
        query_key: &str,
        results: &[LookupResult],
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        let now = Utc::now();
        let entry = CacheEntry {
            source,
            query_key: query_key.to_string(),
            results: results.to_vec(),
            cached_at: now,
            expires_at: expiry_after(now, ttl),
        };
        self.inner
            .tables
            .write()
            .cache
            .insert((source, query_key.to_string()), entry);
        self.wrote();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MilitaryBranch;

    #[tokio::test]
    async fn session_create_get_update() {
        let repo = InMemoryRepository::new();
        let session = VerificationSession::new(ServiceKind::Spotify, None);
        repo.create_session(&session).await.unwrap();

        let fetched = repo.get_session(session.session_id).await.unwrap().unwrap();
        assert_eq!(fetched, session);

        let update = SessionUpdate {
            current_step: Some("collectMilitaryStatus".into()),
            ..SessionUpdate::default()
        };
        let updated = repo.update_session(session.session_id, &update).await.unwrap();
        assert_eq!(updated.current_step.as_deref(), Some("collectMilitaryStatus"));
        assert_eq!(repo.write_count(), 2);
    }

    #[tokio::test]
    async fn update_unknown_session_is_not_found() {
        let repo = InMemoryRepository::new();
        let id = Uuid::new_v4();
        let err = repo
            .update_session(id, &SessionUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::NotFound { kind: "session", id });
    }

    #[tokio::test]
    async fn offline_repository_fails_every_call() {
        let repo = InMemoryRepository::new();
        repo.set_available(false);
        let session = VerificationSession::new(ServiceKind::Other, None);
        assert!(matches!(
            repo.create_session(&session).await,
            Err(RepositoryError::Unavailable(_))
        ));
        assert!(repo.get_cache(RecordSource::GraveLocator, "x").await.is_err());
        repo.set_available(true);
        assert!(repo.create_session(&session).await.is_ok());
    }

    #[tokio::test]
    async fn list_sessions_filters_and_orders_newest_first() {
        let repo = InMemoryRepository::new();
        let mut older = VerificationSession::new(ServiceKind::Chatgpt, None);
        older.created_at = Utc::now() - chrono::Duration::minutes(5);
        let newer = VerificationSession::new(ServiceKind::Chatgpt, None);
        let other = VerificationSession::new(ServiceKind::Youtube, None);
        for s in [&older, &newer, &other] {
            repo.create_session(s).await.unwrap();
        }

        let filter = SessionFilter {
            service_kind: Some(ServiceKind::Chatgpt),
            ..SessionFilter::default()
        };
        let listed = repo.list_sessions(&filter).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].session_id, newer.session_id);
        assert_eq!(listed[1].session_id, older.session_id);
    }

    #[tokio::test]
    async fn records_round_trip() {
        let repo = InMemoryRepository::new();
        let record = PersonalRecord::new("Jane", "Smith", MilitaryBranch::CoastGuard);
        repo.create_record(&record).await.unwrap();
        let fetched = repo.get_record(record.record_id).await.unwrap();
        assert_eq!(fetched, Some(record));
        assert_eq!(repo.record_count(), 1);
    }

    #[tokio::test]
    async fn put_cache_replaces_existing_row() {
        let repo = InMemoryRepository::new();
        let first = vec![LookupResult::new(RecordSource::LegacyMemorial, "A")];
        let second = vec![
            LookupResult::new(RecordSource::LegacyMemorial, "B"),
            LookupResult::new(RecordSource::LegacyMemorial, "C"),
        ];
        let ttl = Duration::from_secs(60);
        repo.put_cache(RecordSource::LegacyMemorial, "k", &first, ttl).await.unwrap();
        repo.put_cache(RecordSource::LegacyMemorial, "k", &second, ttl).await.unwrap();
        let entry = repo
            .get_cache(RecordSource::LegacyMemorial, "k")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.results, second);
        assert!(entry.expires_at > entry.cached_at);
    }

    #[test]
    fn expiry_saturates_on_huge_ttl() {
        let now = Utc::now();
        assert_eq!(
            expiry_after(now, Duration::from_secs(u64::MAX)),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
