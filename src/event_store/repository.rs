//! Event Store Repository
//!
//! PostgreSQL implementation of the event store.
//! The unique constraint on `(aggregate_id, version)` is the only
//! concurrency control: a racing writer targeting the same next version
//! violates it and the whole batch rolls back.

use chrono::Utc;
use sqlx::PgPool;

use crate::domain::{Event, RecordedEvent, ACCOUNT_AGGREGATE_TYPE};

use super::{prepare_batch, AggregateOperation, EventStore, EventStoreError, EventStream};

/// PostgreSQL SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Event Store backed by the `event_store` table
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Create a new PgEventStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventStore for PgEventStore {
    async fn append(&self, batch: Vec<AggregateOperation>) -> Result<(), EventStoreError> {
        let batch = prepare_batch(batch)?;

        // Dropping the transaction without commit rolls the whole batch back
        let mut tx = self.pool.begin().await?;

        for op in &batch {
            let mut version = op.expected_version;

            for event in &op.events {
                version += 1;
                let payload = event.to_payload()?;

                sqlx::query(
                    r#"
                    INSERT INTO event_store (
                        aggregate_id, aggregate_type, event_type, version, payload, created_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(&op.aggregate_id)
                .bind(ACCOUNT_AGGREGATE_TYPE)
                .bind(event.kind().as_str())
                .bind(version)
                .bind(&payload)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(|e| classify_insert_error(e, &op.aggregate_id, version))?;
            }
        }

        tx.commit().await?;

        tracing::debug!(aggregates = batch.len(), "Appended event batch");
        Ok(())
    }

    async fn load(
        &self,
        aggregate_id: &str,
        from_version: i64,
    ) -> Result<EventStream, EventStoreError> {
        let rows: Vec<(String, serde_json::Value, i64)> = sqlx::query_as(
            r#"
            SELECT event_type, payload, version
            FROM event_store
            WHERE aggregate_id = $1 AND version > $2
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id)
        .bind(from_version)
        .fetch_all(&self.pool)
        .await?;

        let mut stream = EventStream {
            events: Vec::with_capacity(rows.len()),
            version: from_version,
        };

        for (event_type, payload, version) in rows {
            let event = Event::decode(&event_type, payload).map_err(|source| {
                EventStoreError::Decode {
                    aggregate_id: aggregate_id.to_string(),
                    version,
                    source,
                }
            })?;

            stream.version = stream.version.max(version);
            stream.events.push(RecordedEvent { version, event });
        }

        Ok(stream)
    }
}

/// Translate a unique violation into a concurrency conflict
fn classify_insert_error(err: sqlx::Error, aggregate_id: &str, version: i64) -> EventStoreError {
    let is_unique_violation = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);

    if is_unique_violation {
        EventStoreError::ConcurrencyConflict {
            aggregate_id: aggregate_id.to_string(),
            version,
        }
    } else {
        EventStoreError::Database(err)
    }
}
