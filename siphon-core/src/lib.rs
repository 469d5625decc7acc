#![warn(missing_docs)]
//! # siphon-core
//!
//! Core types for the Siphon stream-URL resolution service.
//!
//! This crate provides the foundational vocabulary shared by the resolution
//! engine, the storage backends and the HTTP front end:
//!
//! - **Endpoints** ([`Endpoint`], [`ProxyAddress`]) - the third-party
//!   resolver services the engine fans out to
//! - **Targets** ([`TargetUrl`]) - the caller-supplied media page URL
//! - **Keys** ([`StateKey`]) - deterministic storage keys derived from
//!   targets and caller identities
//! - **Values** ([`CacheValue`]) - stored data wrapped with its creation
//!   timestamp for time-to-live evaluation
//! - **Payloads** ([`payload`]) - validation of upstream response documents
//!   and stream-URL field extraction
//! - **Resolution** ([`ResolvedResult`], [`Resolution`], [`Attempt`]) - the
//!   outcome of a multi-endpoint resolution run
//! - **Rate state** ([`RateState`]) - per-caller sliding window counters
//!
//! Everything here is protocol-agnostic plain data; the `siphon` crate adds
//! the network behaviour on top.

pub mod endpoint;
pub mod key;
pub mod payload;
pub mod resolution;
pub mod state;
pub mod target;
pub mod value;

pub use endpoint::{Endpoint, ProxyAddress};
pub use key::StateKey;
pub use payload::{STREAM_FIELDS, extract_stream_url, is_blocked};
pub use resolution::{Attempt, RejectReason, ResolvedResult, Resolution};
pub use state::{RateState, WindowCounter};
pub use target::TargetUrl;
pub use value::CacheValue;
