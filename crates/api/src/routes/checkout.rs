//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::ProducerId;
use domain::PickupSelection;
use fulfillment::{CheckoutOutcome, CheckoutRequest, GroupFailure, PaymentInstruction};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use super::orders::OrderResponse;
use super::parse_id;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub pickup_point: String,
    /// `YYYY-MM-DD`
    pub pickup_date: Option<NaiveDate>,
    #[serde(default)]
    pub pickup_overrides: Vec<PickupOverride>,
    #[serde(default)]
    pub payment: PaymentInstruction,
}

#[derive(Deserialize)]
pub struct PickupOverride {
    pub producer_id: String,
    pub pickup_point: String,
    pub pickup_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub orders: Vec<OrderResponse>,
    pub failures: Vec<GroupFailureResponse>,
    pub unknown_products: Vec<String>,
}

#[derive(Serialize)]
pub struct GroupFailureResponse {
    pub producer_id: String,
    pub error: &'static str,
    pub message: String,
}

impl From<&GroupFailure> for GroupFailureResponse {
    fn from(failure: &GroupFailure) -> Self {
        Self {
            producer_id: failure.producer_id.to_string(),
            error: failure.error.kind(),
            message: failure.error.to_string(),
        }
    }
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        Self {
            orders: outcome.orders.iter().map(OrderResponse::from).collect(),
            failures: outcome
                .failures
                .iter()
                .map(GroupFailureResponse::from)
                .collect(),
            unknown_products: outcome
                .unknown_products
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// POST /checkout: one order per producer in the caller's server cart.
///
/// Responds 201 when at least one order was created and 409 when every
/// producer group failed; the body lists each group either way.
#[tracing::instrument(skip(state, body))]
pub async fn checkout<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let mut request = CheckoutRequest::new(PickupSelection::new(
        body.pickup_point,
        body.pickup_date,
    ))
    .with_payment(body.payment);

    for pickup in body.pickup_overrides {
        let producer_id: ProducerId = parse_id("producer", &pickup.producer_id)?;
        request = request.with_pickup_override(
            producer_id,
            PickupSelection::new(pickup.pickup_point, pickup.pickup_date),
        );
    }

    let outcome = state.lifecycle.checkout(&actor, request).await?;
    let status = if outcome.created_any() {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    };

    Ok((status, Json(outcome.into())))
}
