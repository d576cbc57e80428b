use std::time::Duration;

use crate::error::KVError;

/// KVStore provides a key-value storage interface with optional per-key expiry.
///
/// Keys follow a namespaced convention: `session:<user-id>`, `refresh:<token>`, etc.
/// An expired entry behaves exactly like a missing one; physical removal is
/// left to [`KVStore::purge_expired`].
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist or has expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair, replacing any previous value and expiry.
    /// `ttl = None` stores the entry without expiry.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KVError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Scan all live keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;

    /// Remove every expired entry. Returns the number of entries removed.
    fn purge_expired(&self) -> Result<usize, KVError>;
}
