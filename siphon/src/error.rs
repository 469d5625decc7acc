//! Error types for the resolution pipeline.
//!
//! Only two failures ever reach the caller: a configuration problem (no
//! usable endpoint list) and full endpoint exhaustion. Everything else is
//! absorbed locally: transport and validation failures advance fallback,
//! cache write failures degrade to returning the upstream URL.

use siphon_backend::BackendError;
use siphon_core::Attempt;
use thiserror::Error;

use crate::limiter::RateExceeded;

/// Errors surfaced by [`Siphon::handle`](crate::Siphon::handle).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Endpoint list unreadable or empty. Fatal for the request.
    #[error("configuration error: {0}")]
    Config(String),

    /// Every endpoint failed validation.
    #[error("all {tried} endpoints failed to resolve")]
    Exhausted {
        /// Number of endpoints that were tried.
        tried: usize,
        /// Per-endpoint rejection trace.
        trace: Vec<Attempt>,
    },

    /// The caller was rejected by the rate limiter before any network
    /// activity.
    #[error("rate limited: {0}")]
    RateLimited(#[from] RateExceeded),

    /// Shared-state storage failed outside a recoverable path.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
