//! The storage backend trait.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use siphon_core::StateKey;

use crate::error::BackendError;

/// Raw byte data stored by backends. `Bytes` gives cheap reference-counted
/// cloning between the CAS loop and the caller.
pub type Raw = bytes::Bytes;

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Outcome of a remove operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteStatus {
    /// The key existed and was removed.
    Deleted,
    /// The key was not present.
    Missing,
}

/// Key-value storage over raw bytes.
///
/// Concurrent read/increment must never corrupt stored counts; strict
/// serializability is not required. `compare_swap` is the atomic primitive
/// the rate limiter builds its read-modify-write loop on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn read(&self, key: &StateKey) -> BackendResult<Option<Raw>>;

    /// Unconditionally writes `value` under `key` (last writer wins).
    async fn write(&self, key: &StateKey, value: Raw) -> BackendResult<()>;

    /// Removes the value stored under `key`.
    async fn remove(&self, key: &StateKey) -> BackendResult<DeleteStatus>;

    /// Writes `value` under `key` only if the current value equals
    /// `expected` (`None` = key absent). Returns whether the swap applied.
    async fn compare_swap(
        &self,
        key: &StateKey,
        expected: Option<&Raw>,
        value: Raw,
    ) -> BackendResult<bool>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend> {
    async fn read(&self, key: &StateKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &StateKey, value: Raw) -> BackendResult<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &StateKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn compare_swap(
        &self,
        key: &StateKey,
        expected: Option<&Raw>,
        value: Raw,
    ) -> BackendResult<bool> {
        (**self).compare_swap(key, expected, value).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Typed JSON accessors over a [`Backend`].
///
/// Values are serialized with `serde_json`, the shared on-wire format for
/// cache entries and rate state.
pub trait BackendExt: Backend {
    /// Reads and deserializes the value under `key`.
    fn get_json<T>(&self, key: &StateKey) -> impl Future<Output = BackendResult<Option<T>>> + Send
    where
        T: DeserializeOwned + Send,
        Self: Sync,
    {
        async move {
            match self.read(key).await? {
                Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
                None => Ok(None),
            }
        }
    }

    /// Serializes and writes `value` under `key`.
    fn put_json<T>(
        &self,
        key: &StateKey,
        value: &T,
    ) -> impl Future<Output = BackendResult<()>> + Send
    where
        T: Serialize + Sync,
        Self: Sync,
    {
        async move {
            let raw = Raw::from(serde_json::to_vec(value)?);
            self.write(key, raw).await
        }
    }
}

impl<B: Backend + ?Sized> BackendExt for B {}
