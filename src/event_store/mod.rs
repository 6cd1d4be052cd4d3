//! Event Store module
//!
//! Persistence layer for Event Sourcing: an ordered, append-only log per
//! aggregate with optimistic concurrency on `(aggregate_id, version)`.

mod error;
mod memory;
mod repository;

use std::collections::HashSet;
use std::future::Future;

use crate::domain::{Event, RecordedEvent};

pub use error::EventStoreError;
pub use memory::InMemoryEventStore;
pub use repository::PgEventStore;

/// New events for one aggregate, appended after `expected_version`
#[derive(Debug, Clone)]
pub struct AggregateOperation {
    pub aggregate_id: String,
    pub expected_version: i64,
    pub events: Vec<Event>,
}

impl AggregateOperation {
    /// Create a new aggregate operation
    pub fn new(aggregate_id: impl Into<String>, expected_version: i64, events: Vec<Event>) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            expected_version,
            events,
        }
    }
}

/// Events read back for one aggregate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStream {
    /// Events in ascending version order
    pub events: Vec<RecordedEvent>,
    /// Highest version observed, or the requested starting version if none
    pub version: i64,
}

/// Durable per-aggregate event log
pub trait EventStore: Send + Sync {
    /// Atomically append events for every aggregate in the batch.
    ///
    /// Each operation's events land at `expected_version + 1`, `+ 2`, ... and
    /// the whole batch commits or none of it does. A target version that
    /// already exists fails the batch with
    /// [`EventStoreError::ConcurrencyConflict`].
    fn append(
        &self,
        batch: Vec<AggregateOperation>,
    ) -> impl Future<Output = Result<(), EventStoreError>> + Send;

    /// Load events with version strictly greater than `from_version`
    fn load(
        &self,
        aggregate_id: &str,
        from_version: i64,
    ) -> impl Future<Output = Result<EventStream, EventStoreError>> + Send;
}

/// Validate a batch and order it by aggregate id.
///
/// Concurrent batches then touch shared aggregates in the same order, so two
/// transfers in opposite directions conflict instead of deadlocking.
fn prepare_batch(
    mut batch: Vec<AggregateOperation>,
) -> Result<Vec<AggregateOperation>, EventStoreError> {
    let mut seen = HashSet::with_capacity(batch.len());

    for op in &batch {
        if !seen.insert(op.aggregate_id.as_str()) {
            return Err(EventStoreError::InvalidBatch(format!(
                "aggregate {} appears more than once",
                op.aggregate_id
            )));
        }
        if op.expected_version < 0 {
            return Err(EventStoreError::InvalidBatch(format!(
                "negative expected version {} for aggregate {}",
                op.expected_version, op.aggregate_id
            )));
        }
        if let Some(event) = op.events.iter().find(|e| e.aggregate_id != op.aggregate_id) {
            return Err(EventStoreError::InvalidBatch(format!(
                "event {} targets aggregate {} but was filed under {}",
                event.id, event.aggregate_id, op.aggregate_id
            )));
        }
    }

    batch.retain(|op| !op.events.is_empty());
    batch.sort_by(|a, b| a.aggregate_id.cmp(&b.aggregate_id));
    Ok(batch)
}
