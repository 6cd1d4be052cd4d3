//! API module
//!
//! HTTP API endpoints, middleware and the assembled application router.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware as axum_middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::event_store::EventStore;
use crate::ledger::LedgerService;
use crate::metrics::Metrics;
use crate::snapshot::SnapshotStore;

pub use routes::{create_router, SharedLedger};

/// Response headers set on every reply
const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::CONTENT_SECURITY_POLICY, "default-src 'none'; frame-ancestors 'none'"),
    (header::STRICT_TRANSPORT_SECURITY, "max-age=63072000; includeSubDomains"),
];

/// Build the application router: versioned API, health probes and the
/// middleware stack. Request metrics go to `metrics`.
pub fn build_app<E, S>(ledger: LedgerService<E, S>, metrics: Arc<Metrics>, cors_origin: &str) -> Router
where
    E: EventStore + 'static,
    S: SnapshotStore + 'static,
{
    let request_id = HeaderName::from_static(middleware::REQUEST_ID_HEADER);

    let [nosniff, frame, referrer, csp, hsts] = SECURITY_HEADERS
        .map(|(name, value)| SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value)));

    // Layers run top to bottom: id assigned, traced, secured, logged,
    // measured, then routed
    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(nosniff)
        .layer(frame)
        .layer(referrer)
        .layer(csp)
        .layer(hsts)
        .layer(cors_layer(cors_origin))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn_with_state(
            metrics,
            middleware::metrics_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .nest("/api/v1", create_router::<E, S>())
        .layer(layers)
        .with_state(Arc::new(ledger))
}

/// Router for the metrics listener: `GET /metrics` in Prometheus text format
pub fn metrics_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics.content_type())], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// CORS for the configured origin; `*` or an unparsable origin allows any
fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origin == "*" {
        return cors.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, allowing any");
            cors.allow_origin(Any)
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
