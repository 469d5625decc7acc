//! # siphon
//!
//! The Siphon resolution engine. Given a caller-supplied media page URL,
//! Siphon queries an ordered list of third-party resolver endpoints until
//! one yields a playable stream URL, shaping each outbound request to avoid
//! upstream blocking, caching successful resolutions, and throttling
//! abusive callers.
//!
//! Control flow for one inbound request:
//!
//! ```text
//! rate limiter admission -> cache lookup -> engine fan-out/fallback
//!     -> cache write -> outcome
//! ```
//!
//! orchestrated by [`Siphon`](service::Siphon); the pieces are usable on
//! their own:
//!
//! - [`registry`] - loads endpoint templates and proxy addresses from flat
//!   files
//! - [`shaper`] - builds shaped outbound requests (identity rotation,
//!   referer derivation, proxy selection, uniform timeout/TLS policy)
//! - [`engine`] - sequential or concurrent multi-endpoint resolution with
//!   priority-ordered winner selection
//! - [`cache`] - TTL'd resolution cache with optional one-shot media
//!   download
//! - [`limiter`] - minute/hour/day sliding windows with temporary bans
//! - [`config`] - YAML configuration covering every toggle above

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod registry;
pub mod service;
pub mod shaper;

pub use cache::{CacheStore, CachedResolution};
pub use config::Config;
pub use engine::{Engine, ExecutionMode};
pub use error::ResolveError;
pub use limiter::{RateExceeded, RateLimiter, RateRules};
pub use registry::Registry;
pub use service::{Outcome, Siphon};
pub use shaper::EvasionPolicy;

pub use siphon_core::{
    Attempt, CacheValue, Endpoint, ProxyAddress, RejectReason, ResolvedResult, Resolution,
    StateKey, TargetUrl,
};
