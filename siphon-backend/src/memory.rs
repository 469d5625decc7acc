//! In-memory backend implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use siphon_core::StateKey;

use crate::backend::{Backend, BackendResult, DeleteStatus, Raw};

/// In-process key-value backend over a concurrent hash map.
///
/// Reads and writes are lock-free per shard; `compare_swap` holds the
/// entry's shard lock for the compare and the write, so the rate limiter's
/// read-modify-write loop observes real CAS semantics.
///
/// Data is neither persisted nor shared across processes; use
/// [`FileBackend`](crate::FileBackend) when state must survive a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: DashMap<StateKey, Raw>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the backend holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn read(&self, key: &StateKey) -> BackendResult<Option<Raw>> {
        Ok(self.map.get(key).map(|entry| entry.value().clone()))
    }

    async fn write(&self, key: &StateKey, value: Raw) -> BackendResult<()> {
        self.map.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &StateKey) -> BackendResult<DeleteStatus> {
        match self.map.remove(key) {
            Some(_) => Ok(DeleteStatus::Deleted),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn compare_swap(
        &self,
        key: &StateKey,
        expected: Option<&Raw>,
        value: Raw,
    ) -> BackendResult<bool> {
        match (self.map.entry(key.clone()), expected) {
            (Entry::Occupied(mut occupied), Some(expected)) => {
                if occupied.get() == expected {
                    occupied.insert(value);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            (Entry::Occupied(_), None) => Ok(false),
            (Entry::Vacant(vacant), None) => {
                vacant.insert(value);
                Ok(true)
            }
            (Entry::Vacant(_), Some(_)) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
