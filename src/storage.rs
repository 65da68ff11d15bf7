//! Key/value persistence for balance records
//!
//! Two backends sit behind [`KvBackend`]: RocksDB for durable local state and an
//! in-memory map for tests and dry runs.

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::{HoopshotResult, StorageError};
use dashmap::DashMap;
use rocksdb::{Options, WriteOptions, DB};
use std::path::Path;
use std::sync::Arc;

/// Minimal byte-oriented store used by the balance store
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &[u8]) -> HoopshotResult<Option<Vec<u8>>>;

    /// Overwrite `key`. Returns only once the write is durable for this backend.
    fn put(&self, key: &[u8], value: &[u8]) -> HoopshotResult<()>;
}

/// RocksDB-backed store
#[derive(Clone)]
pub struct RocksBackend {
    db: Arc<DB>,
    sync_writes: bool,
}

impl RocksBackend {
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> HoopshotResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref()).map_err(|e| {
            StorageError::DatabaseOpenFailed(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Ok(Self {
            db: Arc::new(db),
            sync_writes,
        })
    }
}

impl KvBackend for RocksBackend {
    fn get(&self, key: &[u8]) -> HoopshotResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::ReadFailed(e.to_string()).into())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> HoopshotResult<()> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        self.db
            .put_opt(key, value, &write_opts)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }
}

/// Process-local store; contents are lost on exit
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<DashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> HoopshotResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> HoopshotResult<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

/// Open the backend selected by configuration
pub fn open_backend(config: &StorageConfig) -> HoopshotResult<Arc<dyn KvBackend>> {
    match config.backend {
        StorageBackend::RocksDb => {
            std::fs::create_dir_all(&config.data_directory)?;
            let backend = RocksBackend::open(&config.data_directory, config.sync_writes)?;
            tracing::debug!(path = %config.data_directory, "Opened RocksDB balance store");
            Ok(Arc::new(backend))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_backend_overwrites() {
        let backend = MemoryBackend::new();
        assert!(backend.get(b"balance_1").unwrap().is_none());

        backend.put(b"balance_1", b"10").unwrap();
        backend.put(b"balance_1", b"12.5").unwrap();

        assert_eq!(backend.get(b"balance_1").unwrap(), Some(b"12.5".to_vec()));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_rocks_backend_survives_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let backend = RocksBackend::open(dir.path(), true).unwrap();
            backend.put(b"balance_42", b"116.00").unwrap();
        }

        let reopened = RocksBackend::open(dir.path(), true).unwrap();
        assert_eq!(reopened.get(b"balance_42").unwrap(), Some(b"116.00".to_vec()));
        assert!(reopened.get(b"balance_43").unwrap().is_none());
    }
}
