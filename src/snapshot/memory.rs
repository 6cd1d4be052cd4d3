//! In-memory snapshot store for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Snapshot, SnapshotStore, SnapshotStoreError};

#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<String, Snapshot>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> Result<(), SnapshotStoreError> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn load(&self, aggregate_id: &str) -> Result<Option<Snapshot>, SnapshotStoreError> {
        Ok(self.snapshots.read().await.get(aggregate_id).cloned())
    }
}
