use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::Collection;
use crate::utils::error::{AppError, AppResult};

/// Whole-collection persistence. No indexing, no partial writes, no locking.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every record of `collection`, or an empty list if nothing was ever saved.
    async fn load(&self, collection: Collection) -> AppResult<Vec<Value>>;

    /// Replaces the whole collection.
    async fn save(&self, collection: Collection, records: &[Value]) -> AppResult<()>;
}

/// One pretty-printed JSON array per collection inside `dir`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self, collection: Collection) -> AppResult<Vec<Value>> {
        let path = self.path_for(collection);

        let raw = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::internal(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&raw).map_err(|e| {
            AppError::internal(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    async fn save(&self, collection: Collection, records: &[Value]) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(collection);
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            collection.file_name(),
            uuid::Uuid::new_v4().simple()
        ));

        let body = serde_json::to_vec_pretty(records)?;
        if let Err(e) = tokio::fs::write(&tmp, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::internal(format!(
                "Failed to write {}: {}",
                tmp.display(),
                e
            )));
        }

        // rename is atomic on the same filesystem, readers see old or new, never half
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::internal(format!(
                "Failed to replace {}: {}",
                path.display(),
                e
            )));
        }

        log::debug!("💾 Saved {} {} record(s)", records.len(), collection.as_str());
        Ok(())
    }
}

/// In-process store. Used by tests; can be told to fail saves for a collection.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
    failing: Mutex<HashSet<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `save` of `collection` fails until [`MemoryStore::heal`] is called.
    pub fn fail_saves(&self, collection: Collection) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(collection);
        }
    }

    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, collection: Collection) -> AppResult<Vec<Value>> {
        let collections = self
            .collections
            .lock()
            .map_err(|_| AppError::internal("memory store poisoned"))?;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn save(&self, collection: Collection, records: &[Value]) -> AppResult<()> {
        let should_fail = self
            .failing
            .lock()
            .map(|f| f.contains(&collection))
            .unwrap_or(false);
        if should_fail {
            return Err(AppError::internal(format!(
                "injected save failure for {}",
                collection.as_str()
            )));
        }

        let mut collections = self
            .collections
            .lock()
            .map_err(|_| AppError::internal("memory store poisoned"))?;
        collections.insert(collection, records.to_vec());
        Ok(())
    }
}
