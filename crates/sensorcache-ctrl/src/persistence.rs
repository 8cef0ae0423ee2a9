//! Cache persistence strategies
//!
//! The controller saves the store after every successful complete update and
//! on shutdown, and tries to load a saved store on startup so the first
//! requests do not wait for a full rebuild.

use async_trait::async_trait;
use sensorcache_common::{Error, Result};
use sensorcache_store::CacheStore;
use std::path::{Path, PathBuf};
use tracing::debug;

#[async_trait]
pub trait CachePersistenceStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn save(&self, store: &CacheStore) -> Result<()>;

    /// Load a previously saved store, `None` if there is none
    async fn load(&self) -> Result<Option<CacheStore>>;
}

/// Persistence that keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpPersistence;

#[async_trait]
impl CachePersistenceStrategy for NoOpPersistence {
    fn name(&self) -> &str {
        "noop"
    }

    async fn save(&self, _store: &CacheStore) -> Result<()> {
        Ok(())
    }

    async fn load(&self) -> Result<Option<CacheStore>> {
        Ok(None)
    }
}

/// Persists the store as a JSON document
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CachePersistenceStrategy for JsonFilePersistence {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn save(&self, store: &CacheStore) -> Result<()> {
        let json = serde_json::to_vec(store)
            .map_err(|e| Error::persistence(format!("failed to serialize cache: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await.map_err(|e| {
            Error::persistence(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::persistence(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        debug!(
            "Persisted cache snapshot to {} ({} bytes)",
            self.path.display(),
            json.len()
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<CacheStore>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::persistence(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        let store = serde_json::from_slice(&bytes).map_err(|e| {
            Error::persistence(format!("corrupt cache snapshot {}: {e}", self.path.display()))
        })?;
        Ok(Some(store))
    }
}
