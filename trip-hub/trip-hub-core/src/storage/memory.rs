//! In-process backend for tests and ephemeral deployments.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::DocumentBackend;
use crate::error::Result;
use crate::tenant::TenantKey;

#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<HashMap<TenantKey, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

impl DocumentBackend for MemoryBackend {
    fn get(&self, key: &TenantKey) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn put(&self, key: &TenantKey, data: &[u8]) -> Result<()> {
        self.data.lock().insert(key.clone(), data.to_vec());
        Ok(())
    }
}
