//! The session store seam.
//!
//! [`SessionManager`](crate::session::SessionManager) talks to any
//! [`SessionStore`]; [`KvSessionStore`] adapts a synchronous
//! [`KVStore`] by running each call on the blocking thread pool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crewkit_kv::KVStore;

use crate::error::StoreError;

/// Durable key/value storage with per-key expiry.
///
/// Implementations must treat deleting a missing key as success and must
/// report backend failures as [`StoreError`], never as a missing value.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// [`SessionStore`] over any [`KVStore`] backend.
#[derive(Clone)]
pub struct KvSessionStore {
    kv: Arc<dyn KVStore>,
}

impl KvSessionStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self { kv }
    }

    /// The wrapped backend, e.g. for scheduling expiry purges.
    pub fn kv(&self) -> &Arc<dyn KVStore> {
        &self.kv
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KVStore) -> Result<T, crewkit_kv::KVError> + Send + 'static,
    {
        let kv = Arc::clone(&self.kv);
        tokio::task::spawn_blocking(move || op(kv.as_ref()))
            .await
            .map_err(|e| StoreError::Backend(format!("store task failed: {}", e)))?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl SessionStore for KvSessionStore {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError> {
        let key = key.to_string();
        self.blocking(move |kv| kv.set(&key, &value, ttl)).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let key = key.to_string();
        self.blocking(move |kv| kv.get(&key)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.blocking(move |kv| kv.delete(&key)).await
    }
}
