//! Event Store Errors
//!
//! Error types for event store operations.

use crate::domain::EventDecodeError;

/// Errors that can occur in the event store
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Optimistic concurrency conflict: the target version already exists
    #[error("Concurrency conflict: aggregate {aggregate_id} version {version} already exists")]
    ConcurrencyConflict { aggregate_id: String, version: i64 },

    /// The batch is malformed and was rejected before touching storage
    #[error("Invalid append batch: {0}")]
    InvalidBatch(String),

    /// A stored event could not be reconstructed
    #[error("Failed to decode event {version} of aggregate {aggregate_id}: {source}")]
    Decode {
        aggregate_id: String,
        version: i64,
        #[source]
        source: EventDecodeError,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Check if this error is a concurrency conflict
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}
