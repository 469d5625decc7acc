//! The caller-supplied target URL.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The media page URL a caller wants resolved.
///
/// The target is treated as an opaque string: it is never parsed beyond the
/// origin heuristic used for referer derivation. It serves both as the
/// cache-key source and as the parameter encoded into each endpoint
/// template.
///
/// # Example
///
/// ```
/// use siphon_core::TargetUrl;
///
/// let target = TargetUrl::new("https://v.example.com/play?id=42").unwrap();
/// assert_eq!(target.as_str(), "https://v.example.com/play?id=42");
///
/// // Empty targets are rejected.
/// assert!(TargetUrl::new("").is_none());
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetUrl(String);

impl TargetUrl {
    /// Wraps a raw target URL, rejecting empty input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(TargetUrl(raw))
        }
    }

    /// Returns the raw URL string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
