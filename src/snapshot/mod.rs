//! Snapshot module
//!
//! Point-in-time materialization of an aggregate's folded state. A snapshot
//! is a cache: at most one is kept per aggregate, writes are unconditional
//! upserts, and losing one only costs replay time.

mod memory;
mod repository;

use std::future::Future;

pub use memory::InMemorySnapshotStore;
pub use repository::PgSnapshotStore;

/// Folded state of an aggregate at a known version
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub aggregate_id: String,
    /// Version after which replay resumes
    pub version: i64,
    /// Serialized aggregate state
    pub state: serde_json::Value,
}

/// Errors that can occur in the snapshot store
#[derive(Debug, thiserror::Error)]
pub enum SnapshotStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable snapshot cache
pub trait SnapshotStore: Send + Sync {
    /// Upsert the snapshot, replacing any previous one for the aggregate
    fn save(&self, snapshot: Snapshot) -> impl Future<Output = Result<(), SnapshotStoreError>> + Send;

    /// Load the current snapshot, `None` when there is none
    fn load(
        &self,
        aggregate_id: &str,
    ) -> impl Future<Output = Result<Option<Snapshot>, SnapshotStoreError>> + Send;
}
