use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::models::{CartSnapshot, RepositoryResult, SnapshotRead};
use crate::repositories::KeyValueStorage;

/// Trait defining the interface for cart snapshot persistence
pub trait CartRepository: Send + Sync {
    /// Read and decode the persisted snapshot
    fn find_snapshot(&self) -> RepositoryResult<SnapshotRead>;

    /// Persist a full snapshot, replacing any prior value
    fn save_snapshot(&self, snapshot: &CartSnapshot) -> RepositoryResult<()>;

    /// Delete the persisted snapshot
    fn delete_snapshot(&self) -> RepositoryResult<()>;
}

/// Cart repository that keeps the snapshot as a JSON array under one storage key
pub struct StorageCartRepository {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl StorageCartRepository {
    /// Create a repository over a storage port and key
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Get the storage key (for testing)
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for StorageCartRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCartRepository")
            .field("key", &self.key)
            .finish()
    }
}

impl CartRepository for StorageCartRepository {
    #[instrument(skip(self), fields(key = %self.key))]
    fn find_snapshot(&self) -> RepositoryResult<SnapshotRead> {
        let raw = self.storage.get_item(&self.key)?;
        let read = CartSnapshot::decode(raw.as_deref());
        debug!(
            absent = matches!(read, SnapshotRead::Absent),
            malformed = read.is_malformed(),
            "Snapshot read"
        );
        Ok(read)
    }

    #[instrument(skip(self, snapshot), fields(key = %self.key, item_count = snapshot.len()))]
    fn save_snapshot(&self, snapshot: &CartSnapshot) -> RepositoryResult<()> {
        let encoded = snapshot.encode()?;
        self.storage.set_item(&self.key, &encoded)?;
        info!("Snapshot saved");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %self.key))]
    fn delete_snapshot(&self) -> RepositoryResult<()> {
        self.storage.remove_item(&self.key)?;
        info!("Snapshot deleted");
        Ok(())
    }
}
