//! Typed repository over a [`DocumentStore`].
//!
//! Every read-modify-write cycle runs under the lock of each collection it
//! touches. Plain reads are lock-free: the file store replaces documents
//! atomically, so a reader always sees a complete collection.

mod ids;
pub mod store;
mod transaction;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

pub use ids::{next_id, IdPolicy};
pub use store::{DocumentStore, JsonFileStore, MemoryStore};
pub use transaction::Snapshot;

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Clubs,
    Events,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Clubs => "clubs",
            Collection::Events => "events",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Clubs => "clubs.json",
            Collection::Events => "events.json",
        }
    }
}

/// A record type stored as one element of a collection document.
pub trait Record: Serialize + DeserializeOwned + Send {
    const COLLECTION: Collection;

    /// Unique key within the collection (`id` or `username`).
    fn key(&self) -> &str;
}

struct CollectionLocks {
    users: Mutex<()>,
    clubs: Mutex<()>,
    events: Mutex<()>,
}

impl CollectionLocks {
    fn get(&self, collection: Collection) -> &Mutex<()> {
        match collection {
            Collection::Users => &self.users,
            Collection::Clubs => &self.clubs,
            Collection::Events => &self.events,
        }
    }
}

#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    locks: Arc<CollectionLocks>,
    id_policy: IdPolicy,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>, id_policy: IdPolicy) -> Self {
        Self {
            store,
            locks: Arc::new(CollectionLocks {
                users: Mutex::new(()),
                clubs: Mutex::new(()),
                events: Mutex::new(()),
            }),
            id_policy,
        }
    }

    pub fn id_policy(&self) -> IdPolicy {
        self.id_policy
    }

    pub async fn load_all<T: Record>(&self) -> AppResult<Vec<T>> {
        let raw = self.store.load(T::COLLECTION).await?;
        decode(T::COLLECTION, raw)
    }

    pub async fn find<T: Record>(&self, key: &str) -> AppResult<Option<T>> {
        Ok(self
            .load_all::<T>()
            .await?
            .into_iter()
            .find(|record| record.key() == key))
    }

    /// Loads `T`'s collection under its lock, applies `f`, and writes the result back.
    ///
    /// Nothing is written when `f` fails.
    pub async fn transact<T, R, F>(&self, f: F) -> AppResult<R>
    where
        T: Record,
        F: FnOnce(&mut Vec<T>) -> AppResult<R>,
    {
        let _guard = self.locks.get(T::COLLECTION).lock().await;

        let mut records = self.load_all::<T>().await?;
        let out = f(&mut records)?;

        let encoded = encode(&records)?;
        self.store.save(T::COLLECTION, &encoded).await?;
        Ok(out)
    }
}

fn decode<T: DeserializeOwned>(collection: Collection, raw: Vec<Value>) -> AppResult<Vec<T>> {
    raw.into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value).map_err(|e| {
                AppError::internal(format!(
                    "Invalid record #{} in {}: {}",
                    i,
                    collection.as_str(),
                    e
                ))
            })
        })
        .collect()
}

fn encode<T: Serialize>(records: &[T]) -> AppResult<Vec<Value>> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(AppError::from))
        .collect()
}
