//! # muster-provider — Typed client for the verification provider
//!
//! The provider runs a multi-step proof-of-eligibility protocol. This crate
//! exposes that protocol as the [`VerificationProvider`] trait and ships two
//! implementations:
//!
//! - [`HttpVerificationProvider`]: `reqwest` over HTTPS, bearer-token
//!   authenticated. Steps are sent once; status reads are resent after
//!   transport failures.
//! - [`MockVerificationProvider`]: scripted, in-process.
//!
//! ## Client identity
//!
//! Requests identify as `muster/<version>` and carry fresh correlation
//! headers ([`RequestHeaders`]). Nothing about the client is disguised.
//!
//! ## Step vocabulary
//!
//! Provider step tokens are interpreted only by [`steps::canonical_status`].

pub mod client;
pub mod config;
pub(crate) mod delivery;
pub mod error;
pub mod headers;
pub mod mock;
pub mod steps;

pub use client::{
    HttpVerificationProvider, PersonalInfoRequest, ProviderStep, VerificationProvider, USER_AGENT,
};
pub use config::{ConfigError, ProviderConfig};
pub use error::ProviderError;
pub use headers::RequestHeaders;
pub use mock::{MockVerificationProvider, ProviderCall};
pub use steps::canonical_status;
