//! Key/value storage with per-key expiry.
//!
//! Backs the session store of the auth module. Two backends:
//!
//! - [`RedbStore`]: embedded redb database file.
//! - [`MemoryStore`]: in-process map, for tests and ephemeral deployments.

pub mod entry;
pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use entry::Entry;
pub use error::KVError;
pub use memory::MemoryStore;
pub use self::redb::RedbStore;
pub use traits::KVStore;
