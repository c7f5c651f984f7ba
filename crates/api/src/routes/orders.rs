//! Order status, cancellation and payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::OrderId;
use domain::{Order, OrderStatus, TransitionRequest};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
    /// Explicit restock choice when a producer cancels.
    pub restock: Option<bool>,
}

#[derive(Deserialize)]
pub struct CancelQuery {
    pub restock: Option<bool>,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub payment_method_id: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub producer_id: String,
    pub status: OrderStatus,
    pub payment_status: String,
    pub lines: Vec<OrderLineResponse>,
    pub total_cents: i64,
    pub total: String,
    pub pickup_point: String,
    pub pickup_date: Option<String>,
    pub payment_method_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub unit_price: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            producer_id: order.producer_id().to_string(),
            status: order.status(),
            payment_status: order.payment_status().to_string(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    unit_price: line.unit_price.to_string(),
                })
                .collect(),
            total_cents: order.total().cents(),
            total: order.total().to_string(),
            pickup_point: order.pickup().pickup_point.clone(),
            pickup_date: order
                .pickup()
                .pickup_date
                .map(projections::format::format_date),
            payment_method_id: order.payment_method_id().map(String::from),
            payment_intent_id: order.payment_intent_id().map(String::from),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// GET /orders/{id}: visible to the order's customer and producer only.
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let order = state.lifecycle.get_order(&actor, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/status: move the order along the status machine.
#[tracing::instrument(skip(state, req))]
pub async fn transition<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let request = TransitionRequest {
        target: req.status,
        restock: req.restock,
    };
    let order = state
        .lifecycle
        .transition(&actor, order_id, request)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel[?restock=true|false]
#[tracing::instrument(skip(state, query))]
pub async fn cancel<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let order = state
        .lifecycle
        .cancel_order(&actor, order_id, query.restock)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/payment: retry a failed or pending payment.
#[tracing::instrument(skip(state, req))]
pub async fn retry_payment<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    if req.payment_method_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "payment_method_id is required".to_string(),
        ));
    }

    let order = state
        .lifecycle
        .retry_payment(&actor, order_id, req.payment_method_id)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}
