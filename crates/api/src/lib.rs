//! HTTP API server for drone delivery monitoring.
//!
//! Exposes order, issue, negligence report and drone command endpoints over
//! the application context, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod context;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use context::{AppContext, Repositories};
pub use error::ApiError;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(context: Arc<AppContext>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/deliver", post(routes::orders::deliver))
        .route("/orders/{id}/succeed", post(routes::orders::succeed))
        .route("/orders/{id}/fail", post(routes::orders::fail))
        .route("/orders/{id}/reschedule", post(routes::orders::reschedule))
        .route("/orders/{id}/telemetry", get(routes::orders::telemetry))
        .route(
            "/issues",
            post(routes::issues::create).get(routes::issues::list),
        )
        .route("/issues/{id}/vision", post(routes::issues::vision))
        .route("/issues/{id}/close", post(routes::issues::close))
        .route("/reports", get(routes::reports::list))
        .route("/reports/{id}/close", post(routes::reports::close))
        .route("/drones/{order_id}/telemetry", post(routes::drones::telemetry))
        .route("/drones/{order_id}/halt", post(routes::drones::halt))
        .route("/drones/{order_id}/proceed", post(routes::drones::proceed))
        .with_state(context)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
