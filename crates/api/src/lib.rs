//! HTTP API for the local-pickup marketplace order core.
//!
//! Exposes the catalog, cart, checkout, order lifecycle and fulfillment views
//! over REST, with structured logging (tracing) and Prometheus metrics. Caller
//! identity comes from the authentication layer's `x-user-id` and
//! `x-user-role` headers.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, create_default_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>).delete(routes::products::archive::<S>),
        )
        .route("/products/{id}/stock", put(routes::products::set_stock::<S>))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/lines", post(routes::cart::add_line::<S>))
        .route(
            "/cart/lines/{product_id}",
            put(routes::cart::set_quantity::<S>).delete(routes::cart::remove_line::<S>),
        )
        .route("/cart/merge", post(routes::cart::merge::<S>))
        .route("/checkout", post(routes::checkout::checkout::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::transition::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/payment", post(routes::orders::retry_payment::<S>))
        .route("/me/orders", get(routes::views::customer_orders::<S>))
        .route("/producer/orders", get(routes::views::producer_orders::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
