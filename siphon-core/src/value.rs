//! Stored values with creation metadata.
//!
//! Every value persisted through a backend is wrapped in a [`CacheValue`]
//! carrying its creation timestamp. Expiry is evaluated logically at read
//! time: an entry older than the configured time-to-live is treated as
//! absent, whether or not it has been physically deleted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored data together with its creation timestamp.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use siphon_core::CacheValue;
/// use chrono::Utc;
///
/// let value = CacheValue::new("payload");
/// assert!(value.is_fresh(Duration::from_secs(60), Utc::now()));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheValue<T> {
    data: T,
    created_at: DateTime<Utc>,
}

impl<T> CacheValue<T> {
    /// Wraps `data` with the current time as creation timestamp.
    pub fn new(data: T) -> Self {
        Self::created_at(data, Utc::now())
    }

    /// Wraps `data` with an explicit creation timestamp.
    pub fn created_at(data: T, created_at: DateTime<Utc>) -> Self {
        CacheValue { data, created_at }
    }

    /// Returns a reference to the stored data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns the creation timestamp.
    #[inline]
    pub fn created(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Consumes the value and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Whether the value is younger than `ttl` as of `now`.
    ///
    /// A value created in the future (clock skew between writers) is
    /// treated as fresh.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match (now - self.created_at).to_std() {
            Ok(age) => age <= ttl,
            Err(_) => true,
        }
    }
}
