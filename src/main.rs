//! event_ledger - event-sourced double-entry ledger server
//!
//! Serves the ledger over HTTP on top of a PostgreSQL event store.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_ledger::event_store::PgEventStore;
use event_ledger::ledger::DEFAULT_MAX_ATTEMPTS;
use event_ledger::snapshot::PgSnapshotStore;
use event_ledger::{api, db, AppResult, Config, LedgerService, Metrics, RetryPolicy};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "event_ledger=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the application router
fn build_router(pool: PgPool, metrics: Arc<Metrics>, config: &Config) -> Router {
    let ledger = LedgerService::new(PgEventStore::new(pool.clone()), PgSnapshotStore::new(pool.clone()))
        .with_retry_policy(RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, config.backoff_unit))
        .with_metrics(metrics.clone());

    let readiness = Router::new()
        .route("/ready", get(readiness_check))
        .with_state(pool);

    api::build_app(ledger, metrics, &config.cors_origin).merge(readiness)
}

/// Readiness probe: the database must answer
async fn readiness_check(State(pool): State<PgPool>) -> AppResult<&'static str> {
    db::verify_connection(&pool).await?;
    Ok("OK")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    init_tracing(config.is_production());

    let addr: SocketAddr = config.bind_address().parse()?;
    let metrics_addr: SocketAddr = config.metrics_bind_address().parse()?;

    tracing::info!(config = ?config, "Starting event_ledger server");
    tracing::info!("Connecting to database at {}", config.redacted_database_url());

    // Create database pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    // Verify database schema
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");
    tracing::info!("Listening on http://{}", addr);

    let metrics = Arc::new(Metrics::new()?);

    // Metrics listener runs beside the API until the process exits
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;
    let metrics_app = api::metrics_router(metrics.clone());
    tokio::spawn(async move {
        tracing::info!("Serving metrics on http://{}/metrics", metrics_addr);
        if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
            tracing::error!(error = %e, "Metrics server failed");
        }
    });

    // Build router and start server
    let app = build_router(pool.clone(), metrics, &config);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
