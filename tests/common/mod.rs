//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;

/// Schema is applied once per test binary; tests run in parallel
static SCHEMA: OnceCell<()> = OnceCell::const_new();

/// Setup test database - connect and make sure the ledger schema exists
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    SCHEMA
        .get_or_init(|| async {
            sqlx::raw_sql(include_str!("../../migrations/0001_ledger.sql"))
                .execute(&pool)
                .await
                .expect("Failed to apply schema");
        })
        .await;

    assert!(
        event_ledger::db::check_schema(&pool).await.unwrap(),
        "schema check failed after migration"
    );

    pool
}

/// Aggregate id unique to one test, so tests sharing a database do not
/// collide
pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}
