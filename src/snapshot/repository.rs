//! Snapshot Repository
//!
//! PostgreSQL implementation of the snapshot store (`snapshots` table).

use sqlx::PgPool;

use super::{Snapshot, SnapshotStore, SnapshotStoreError};

/// Snapshot store backed by the `snapshots` table
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SnapshotStore for PgSnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> Result<(), SnapshotStoreError> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (aggregate_id, version, state, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (aggregate_id)
            DO UPDATE SET version = EXCLUDED.version, state = EXCLUDED.state, created_at = NOW()
            "#,
        )
        .bind(&snapshot.aggregate_id)
        .bind(snapshot.version)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, aggregate_id: &str) -> Result<Option<Snapshot>, SnapshotStoreError> {
        let row: Option<(i64, serde_json::Value)> = sqlx::query_as(
            r#"
            SELECT version, state
            FROM snapshots
            WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(version, state)| Snapshot {
            aggregate_id: aggregate_id.to_string(),
            version,
            state,
        }))
    }
}
