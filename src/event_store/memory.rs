//! In-memory event store
//!
//! Same semantics as the PostgreSQL store (version uniqueness is the only
//! check, batches are all-or-nothing) for tests and local runs without a
//! database. Events go through the same payload encoding so decoding paths
//! are exercised too.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{Event, EventKind, RecordedEvent};

use super::{prepare_batch, AggregateOperation, EventStore, EventStoreError, EventStream};

/// A stored row: discriminator plus serialized payload
#[derive(Debug, Clone)]
struct StoredRow {
    event_type: String,
    payload: serde_json::Value,
}

type Streams = HashMap<String, BTreeMap<i64, StoredRow>>;

/// Event store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<Streams>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw row, bypassing encoding. Lets tests plant payloads that
    /// cannot be decoded.
    #[cfg(test)]
    pub(crate) async fn insert_raw(
        &self,
        aggregate_id: &str,
        version: i64,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), EventStoreError> {
        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id.to_string()).or_default();
        if stream.contains_key(&version) {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_string(),
                version,
            });
        }
        stream.insert(
            version,
            StoredRow {
                event_type: event_type.to_string(),
                payload,
            },
        );
        Ok(())
    }

    /// Versions currently stored for an aggregate, ascending
    #[doc(hidden)]
    pub async fn versions(&self, aggregate_id: &str) -> Vec<i64> {
        self.streams
            .read()
            .await
            .get(aggregate_id)
            .map(|stream| stream.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl EventStore for InMemoryEventStore {
    async fn append(&self, batch: Vec<AggregateOperation>) -> Result<(), EventStoreError> {
        let batch = prepare_batch(batch)?;

        // Encode everything up front so a failure leaves nothing behind
        let mut rows = Vec::new();
        for op in &batch {
            let mut version = op.expected_version;
            for event in &op.events {
                version += 1;
                rows.push((op.aggregate_id.as_str(), version, encode(event)?));
            }
        }

        let mut streams = self.streams.write().await;

        if let Some((aggregate_id, version, _)) = rows.iter().find(|(id, version, _)| {
            streams
                .get(*id)
                .is_some_and(|stream| stream.contains_key(version))
        }) {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: aggregate_id.to_string(),
                version: *version,
            });
        }

        for (aggregate_id, version, row) in rows {
            streams
                .entry(aggregate_id.to_string())
                .or_default()
                .insert(version, row);
        }

        Ok(())
    }

    async fn load(
        &self,
        aggregate_id: &str,
        from_version: i64,
    ) -> Result<EventStream, EventStoreError> {
        let streams = self.streams.read().await;

        let mut stream = EventStream {
            events: Vec::new(),
            version: from_version,
        };

        let Some(rows) = streams.get(aggregate_id) else {
            return Ok(stream);
        };

        for (&version, row) in rows.range(from_version.saturating_add(1)..) {
            let event = Event::decode(&row.event_type, row.payload.clone()).map_err(|source| {
                EventStoreError::Decode {
                    aggregate_id: aggregate_id.to_string(),
                    version,
                    source,
                }
            })?;
            stream.version = version;
            stream.events.push(RecordedEvent { version, event });
        }

        Ok(stream)
    }
}

fn encode(event: &Event) -> Result<StoredRow, EventStoreError> {
    let kind: EventKind = event.kind();
    Ok(StoredRow {
        event_type: kind.as_str().to_string(),
        payload: event.to_payload()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn created(id: &str) -> Event {
        Event::account_created(id, "owner", Utc::now())
    }

    fn posted(id: &str, tx: &str) -> Event {
        Event::transaction_posted(
            format!("{tx}-{id}"),
            id,
            tx,
            dec!(10),
            "test".to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_append_and_load_in_version_order() {
        let store = InMemoryEventStore::new();

        store
            .append(vec![AggregateOperation::new(
                "A",
                0,
                vec![created("A"), posted("A", "t1"), posted("A", "t2")],
            )])
            .await
            .unwrap();

        let stream = store.load("A", 0).await.unwrap();
        let versions: Vec<_> = stream.events.iter().map(|e| e.version).collect();
        assert_eq!(versions, [1, 2, 3]);
        assert_eq!(stream.version, 3);

        let tail = store.load("A", 2).await.unwrap();
        assert_eq!(tail.events.len(), 1);
        assert_eq!(tail.events[0].event.id, "t2-A");
    }

    #[tokio::test]
    async fn test_load_empty_keeps_from_version() {
        let store = InMemoryEventStore::new();
        let stream = store.load("missing", 7).await.unwrap();
        assert!(stream.events.is_empty());
        assert_eq!(stream.version, 7);
    }

    #[tokio::test]
    async fn test_conflict_rolls_back_whole_batch() {
        let store = InMemoryEventStore::new();
        store
            .append(vec![AggregateOperation::new("B", 0, vec![created("B")])])
            .await
            .unwrap();

        let result = store
            .append(vec![
                AggregateOperation::new("A", 0, vec![created("A")]),
                AggregateOperation::new("B", 0, vec![created("B")]),
            ])
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { ref aggregate_id, version: 1 })
                if aggregate_id == "B"
        ));
        assert!(store.versions("A").await.is_empty());
        assert_eq!(store.versions("B").await, [1]);
    }

    #[tokio::test]
    async fn test_unknown_event_type_fails_load() {
        let store = InMemoryEventStore::new();
        store
            .insert_raw("A", 1, "ACCOUNT_RENAMED", json!({}))
            .await
            .unwrap();

        let err = store.load("A", 0).await.unwrap_err();
        assert!(matches!(err, EventStoreError::Decode { version: 1, .. }));
    }
}
