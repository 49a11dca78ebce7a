//! Pluggable persistence for tenant documents.
//!
//! The store only ever hands a backend fully serialized documents, so a
//! backend's job is reduced to storing opaque bytes per tenant key with
//! atomic replacement.

pub mod fs;
pub mod memory;

pub use fs::FileSystemBackend;
pub use memory::MemoryBackend;

use crate::error::Result;
use crate::tenant::TenantKey;

/// Trait for document storage backends
pub trait DocumentBackend: Send + Sync {
    /// Stored bytes for `key`, or `None` if nothing was ever written.
    fn get(&self, key: &TenantKey) -> Result<Option<Vec<u8>>>;

    /// Replace the bytes stored for `key`. A concurrent `get` observes either
    /// the previous or the new content, never a mix.
    fn put(&self, key: &TenantKey, data: &[u8]) -> Result<()>;

    fn exists(&self, key: &TenantKey) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
