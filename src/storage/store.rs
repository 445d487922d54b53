use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use crate::core::error::Result;
use crate::core::types::TenantKey;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::snapshot::{CompressionType, IndexSnapshot};

/// Durable home of tenant snapshots.
///
/// Records are namespaced by tenant key; implementations need no locking
/// across keys, since each key has a single writer (its shard).
pub trait SnapshotStore: Send + Sync {
    fn save(&self, tenant: &TenantKey, snapshot: &IndexSnapshot) -> Result<()>;

    /// `Ok(None)` when nothing was ever saved for `tenant`.
    fn load(&self, tenant: &TenantKey) -> Result<Option<IndexSnapshot>>;

    fn remove(&self, tenant: &TenantKey) -> Result<()>;

    fn name(&self) -> &str;
}

/// One snapshot file per tenant, replaced atomically on save.
pub struct FileSnapshotStore {
    pub layout: StorageLayout,
    pub compression: CompressionType,
    _lock: FileLock,
}

impl FileSnapshotStore {
    pub fn open(layout: StorageLayout, compression: CompressionType) -> Result<Self> {
        let lock = FileLock::acquire(&layout)?;
        Ok(FileSnapshotStore {
            layout,
            compression,
            _lock: lock,
        })
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, tenant: &TenantKey, snapshot: &IndexSnapshot) -> Result<()> {
        let data = snapshot.encode(self.compression)?;

        // Write beside the target, fsync, then rename over it
        let mut tmp = NamedTempFile::new_in(&self.layout.snapshots_dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.layout.snapshot_path(tenant))?;

        Ok(())
    }

    fn load(&self, tenant: &TenantKey) -> Result<Option<IndexSnapshot>> {
        let data = match fs::read(self.layout.snapshot_path(tenant)) {
            Ok(data) => data,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(IndexSnapshot::decode(&data)?))
    }

    fn remove(&self, tenant: &TenantKey) -> Result<()> {
        match fs::remove_file(self.layout.snapshot_path(tenant)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Keeps encoded snapshots in memory, through the same codec as the file store.
#[derive(Default)]
pub struct MemorySnapshotStore {
    records: Mutex<HashMap<TenantKey, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tenant: &TenantKey) -> bool {
        self.records.lock().contains_key(tenant)
    }

    /// Overwrite the raw record, e.g. to simulate corruption.
    pub fn put_raw(&self, tenant: &TenantKey, data: Vec<u8>) {
        self.records.lock().insert(tenant.clone(), data);
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, tenant: &TenantKey, snapshot: &IndexSnapshot) -> Result<()> {
        let data = snapshot.encode(CompressionType::None)?;
        self.records.lock().insert(tenant.clone(), data);
        Ok(())
    }

    fn load(&self, tenant: &TenantKey) -> Result<Option<IndexSnapshot>> {
        let records = self.records.lock();
        match records.get(tenant) {
            Some(data) => Ok(Some(IndexSnapshot::decode(data)?)),
            None => Ok(None),
        }
    }

    fn remove(&self, tenant: &TenantKey) -> Result<()> {
        self.records.lock().remove(tenant);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
