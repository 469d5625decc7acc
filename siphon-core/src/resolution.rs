//! Resolution outcomes and per-attempt diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::Endpoint;

/// The validated outcome of one successful upstream call: the endpoint that
/// produced it, the extracted stream URL and the full decoded payload.
///
/// This is the unit persisted by the cache store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResult {
    /// Endpoint whose response passed validation.
    pub endpoint: Endpoint,
    /// The extracted playable stream URL.
    pub stream_url: String,
    /// The full decoded upstream payload.
    pub payload: Value,
}

/// Why a single endpoint's response was rejected.
///
/// Rejections advance fallback to the next endpoint; none of them is a
/// user-visible failure on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Network failure or timeout before a response arrived.
    Transport(String),
    /// Upstream answered with a non-200 status.
    Status(u16),
    /// Response body did not decode as JSON.
    MalformedBody(String),
    /// Payload matched a blocked/DMCA signature.
    Blocked,
    /// No candidate field held a non-empty stream URL.
    NoStreamField,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Transport(error) => write!(f, "transport error: {error}"),
            RejectReason::Status(status) => write!(f, "unexpected status {status}"),
            RejectReason::MalformedBody(error) => write!(f, "malformed body: {error}"),
            RejectReason::Blocked => f.write_str("blocked by takedown signature"),
            RejectReason::NoStreamField => f.write_str("no stream url field in payload"),
        }
    }
}

/// One rejected endpoint attempt, kept for the debug trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// The endpoint that was tried.
    pub endpoint: Endpoint,
    /// Why its response was rejected.
    pub reason: RejectReason,
}

/// The outcome of running the engine over the full endpoint sequence.
///
/// `result` is `Some` when any endpoint validated; `attempts` enumerates
/// every rejected endpoint in registry order so an exhausted run can be
/// diagnosed without re-executing it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// The winning result, absent when every endpoint failed validation.
    pub result: Option<ResolvedResult>,
    /// Per-endpoint rejection trace.
    pub attempts: Vec<Attempt>,
}

impl Resolution {
    /// Number of endpoints that were actually attempted.
    pub fn tried(&self) -> usize {
        self.attempts.len() + usize::from(self.result.is_some())
    }
}
