//! Storage key derivation.
//!
//! Cache entries and rate-limiter state share one key-value storage
//! abstraction, so keys carry a namespace (`cache` / `rate`) plus a SHA-256
//! digest of the subject. The digest makes keys deterministic across process
//! restarts and safe to use as file names in durable backends.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::target::TargetUrl;

/// A namespaced storage key.
///
/// # Example
///
/// ```
/// use siphon_core::{StateKey, TargetUrl};
///
/// let target = TargetUrl::new("https://v.example.com/play?id=42").unwrap();
/// let a = StateKey::cache(&target);
/// let b = StateKey::cache(&target);
/// // Identical targets always collide on the same entry.
/// assert_eq!(a, b);
/// assert!(a.to_string().starts_with("cache:"));
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    namespace: String,
    digest: String,
}

impl StateKey {
    /// Creates a key in the given namespace from arbitrary subject bytes.
    pub fn new(namespace: impl Into<String>, subject: &str) -> Self {
        StateKey {
            namespace: namespace.into(),
            digest: digest(subject),
        }
    }

    /// Key for a cached resolution of `target`.
    pub fn cache(target: &TargetUrl) -> Self {
        Self::new("cache", target.as_str())
    }

    /// Key for the rate state of a caller identity (network address).
    pub fn rate(identity: &str) -> Self {
        Self::new("rate", identity)
    }

    /// Returns the key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the hex digest component.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.digest)
    }
}

/// Stable hex digest of a subject string.
pub fn digest(subject: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_targets_share_a_key() {
        let t1 = TargetUrl::new("https://v.example.com/a").unwrap();
        let t2 = TargetUrl::new("https://v.example.com/a").unwrap();
        assert_eq!(StateKey::cache(&t1), StateKey::cache(&t2));
    }

    #[test]
    fn namespaces_do_not_collide() {
        let target = TargetUrl::new("10.0.0.1").unwrap();
        assert_ne!(StateKey::cache(&target), StateKey::rate("10.0.0.1"));
    }

    #[test]
    fn digest_is_stable() {
        // SHA-256 of the literal; guards against accidental algorithm changes
        // that would orphan entries written by earlier processes.
        assert_eq!(
            digest("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
