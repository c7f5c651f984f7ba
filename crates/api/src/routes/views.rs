//! Fulfillment query layer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use projections::{CustomerOrderView, ProducerOrderView};
use store::MarketStore;

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

/// GET /me/orders: the calling customer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn customer_orders<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<Vec<CustomerOrderView>>, ApiError> {
    Ok(Json(state.queries.customer_orders(&actor).await?))
}

/// GET /producer/orders: orders placed with the calling producer, newest first.
#[tracing::instrument(skip(state))]
pub async fn producer_orders<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<Vec<ProducerOrderView>>, ApiError> {
    Ok(Json(state.queries.producer_orders(&actor).await?))
}
