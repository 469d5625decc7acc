//! Durable file-per-key backend implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use siphon_core::StateKey;
use tokio::io::AsyncWriteExt;

use crate::backend::{Backend, BackendResult, DeleteStatus, Raw};

/// Key-value backend storing each entry as one file under a root directory.
///
/// File names are `{namespace}-{digest}`; both components are hex/ascii so
/// no escaping is needed. Writes go through a temporary file and rename, so
/// a crashed writer never leaves a half-written entry behind.
///
/// `compare_swap` here is read-compare-write without a lock. Two processes
/// racing on the same key can both pass the compare; rate counting only
/// needs eventual, monotonic counts, so a lost increment is tolerable.
#[derive(Clone, Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(FileBackend { root })
    }

    /// Returns the backing directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &StateKey) -> PathBuf {
        self.root
            .join(format!("{}-{}", key.namespace(), key.digest()))
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn read(&self, key: &StateKey) -> BackendResult<Option<Raw>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Raw::from(data))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn write(&self, key: &StateKey, value: Raw) -> BackendResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&value).await?;
        file.flush().await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &StateKey) -> BackendResult<DeleteStatus> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(DeleteStatus::Deleted),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(DeleteStatus::Missing)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn compare_swap(
        &self,
        key: &StateKey,
        expected: Option<&Raw>,
        value: Raw,
    ) -> BackendResult<bool> {
        let current = self.read(key).await?;
        if current.as_ref() != expected {
            return Ok(false);
        }
        self.write(key, value).await?;
        Ok(true)
    }

    fn name(&self) -> &str {
        "file"
    }
}
