//! # muster-engine — Verification driver and lookup aggregator
//!
//! ## Components
//!
//! - [`VerificationDriver`] (`driver.rs`): the state machine over the
//!   external verification provider. Owns the step sequence, translates
//!   provider step tokens into canonical status, and produces the next
//!   client action.
//!
//! - [`LookupAggregator`] (`aggregator.rs`): concurrent fan-out of one query
//!   to every public-record source, with per-source failure isolation and a
//!   deterministic merge.
//!
//! - [`LookupCache`] (`cache.rs`): TTL-bounded per-source cache kept in the
//!   repository.
//!
//! - [`Services`] (`services.rs`): the bundle built once from
//!   [`EngineConfig`] and shared by every request handler.
//!
//! ## Logging
//!
//! Everything logs through `tracing` with `session_id` / `source` fields.
//! Installing a subscriber is the embedding binary's job.

pub mod aggregator;
pub mod cache;
pub mod driver;
pub mod error;
pub mod services;

pub use aggregator::LookupAggregator;
pub use cache::{CacheConfig, LookupCache};
pub use driver::{DriverConfig, NextStep, SessionPage, SubmitOutcome, UploadOutcome, VerificationDriver};
pub use error::{DriverError, EngineError, LookupError};
pub use services::{EngineConfig, Services};
