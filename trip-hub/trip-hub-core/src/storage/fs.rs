//! One pretty-printed JSON file per tenant inside a data directory.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::DocumentBackend;
use crate::error::{Result, StoreError};
use crate::tenant::TenantKey;

pub struct FileSystemBackend {
    dir: PathBuf,
}

impl FileSystemBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory where documents are persisted.
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &TenantKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl DocumentBackend for FileSystemBackend {
    fn get(&self, key: &TenantKey) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, key: &TenantKey, data: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        // temp file must live in the same directory for rename to be atomic
        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|e| {
            StoreError::storage(format!(
                "failed to create temp file in {}: {e}",
                self.dir.display()
            ))
        })?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| {
            StoreError::storage(format!("failed to persist {}: {e}", path.display()))
        })?;
        debug!(tenant = %key, path = %path.display(), bytes = data.len(), "document written");
        Ok(())
    }

    fn exists(&self, key: &TenantKey) -> Result<bool> {
        Ok(self.path_for(key).is_file())
    }
}
