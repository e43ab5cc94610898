//! Database layer: typed repository over Firestore or an in-memory store.

pub mod firestore;
pub mod memory;
mod repository;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PATIENTS: &str = "patients";
    pub const DOCTORS: &str = "doctors";
    pub const ACCESS_REQUESTS: &str = "access_requests";
    pub const REPORTS: &str = "reports";
    pub const PRESCRIPTIONS: &str = "prescriptions";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const AUDIT_LOGS: &str = "audit_logs";
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(MemoryStore),
    /// No store reachable; every call fails with a database error.
    Offline,
}

/// Document store handle shared by all handlers.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

/// Projection used for counting documents without decoding them fully.
#[derive(Deserialize)]
struct DocRef {
    #[allow(dead_code)]
    #[serde(default)]
    id: String,
}

impl Database {
    pub fn firestore(store: FirestoreStore) -> Self {
        Self {
            backend: Backend::Firestore(store),
        }
    }

    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::new()),
        }
    }

    /// Database that fails every call (store unavailable at startup).
    pub fn offline() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline_error() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    async fn get<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.get(collection, id).await,
            Backend::Memory(mem) => mem.get(collection, id),
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    async fn put<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.put(collection, id, doc).await,
            Backend::Memory(mem) => mem.put(collection, id, doc),
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(fs) => fs.delete(collection, id).await,
            Backend::Memory(mem) => mem.delete(collection, id),
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    async fn find_by<T>(&self, collection: &str, field: &str, value: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.find_by(collection, field, value).await,
            Backend::Memory(mem) => mem.find_by(collection, field, value),
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    async fn list<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.list(collection).await,
            Backend::Memory(mem) => mem.list(collection),
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    /// Number of documents currently in a collection.
    pub async fn count(&self, collection: &str) -> Result<usize, AppError> {
        match &self.backend {
            Backend::Firestore(fs) => Ok(fs.list::<DocRef>(collection).await?.len()),
            Backend::Memory(mem) => Ok(mem.count(collection)),
            Backend::Offline => Err(Self::offline_error()),
        }
    }

    async fn transact<A, B, R, F>(
        &self,
        first: (&str, &str),
        second: Option<(&str, &str)>,
        apply: F,
    ) -> Result<R, AppError>
    where
        A: Serialize + DeserializeOwned + Sync + Send,
        B: Serialize + DeserializeOwned + Sync + Send,
        R: Send,
        F: FnMut(&mut Option<A>, &mut Option<B>) -> Result<R, AppError> + Send,
    {
        match &self.backend {
            Backend::Firestore(fs) => fs.transact(first, second, apply).await,
            Backend::Memory(mem) => mem.transact(first, second, apply),
            Backend::Offline => Err(Self::offline_error()),
        }
    }
}
