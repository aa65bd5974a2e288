//! # muster-core — Canonical Types for Verification and Record Lookup
//!
//! Every other crate in the workspace depends on `muster-core`; it depends on
//! nothing internal.
//!
//! ## Contents
//!
//! - **Status graph** (`status.rs`): the canonical verification status enum
//!   and the only legal transitions between its values.
//!
//! - **Sessions** (`session.rs`): one run of the external verification
//!   protocol, with its append-only transition log.
//!
//! - **Personal records** (`record.rs`): the subject attributes submitted to
//!   the provider, plus branch / status / document vocabularies.
//!
//! - **Lookups** (`lookup.rs`): normalized queries, per-source results, cache
//!   entries and the response payloads consumed by presentation layers.
//!
//! - **Repository** (`repository.rs`): the narrow persistence interface the
//!   engine consumes, and an in-memory implementation.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `muster-*` crates.
//! - No `.unwrap()` outside tests.
//! - Provider step-token vocabulary never appears here; translation lives in
//!   `muster-provider::steps`.

pub mod lookup;
pub mod record;
pub mod repository;
pub mod session;
pub mod status;

pub use lookup::{
    normalize_name, AggregateResponse, CacheEntry, InvalidQuery, LookupQuery, LookupResponse,
    LookupResult, RecordSource,
};
pub use record::{
    DocumentType, MilitaryBranch, MilitaryStatus, PersonalRecord, RecordError, MAX_NAME_LEN,
};
pub use repository::{
    expiry_after, InMemoryRepository, Repository, RepositoryError, SessionFilter,
};
pub use session::{
    ProviderAlreadyLinked, ServiceKind, SessionUpdate, TransitionRecord, VerificationSession,
};
pub use status::{StatusError, VerificationStatus};
