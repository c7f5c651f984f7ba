//! Server cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{ProductId, SessionId};
use domain::{Cart, CartLine};
use fulfillment::MergeOutcome;
use serde::{Deserialize, Serialize};
use store::MarketStore;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    /// Anonymous session the local cart belongs to; makes the merge replay-safe.
    pub session_id: Option<String>,
    pub lines: Vec<LocalLineRequest>,
}

#[derive(Deserialize)]
pub struct LocalLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub version: i64,
    pub lines: Vec<CartLineResponse>,
    pub total_quantity: u64,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct MergeResponse {
    pub cart: CartResponse,
    pub merged: usize,
    pub dropped: Vec<String>,
    pub already_merged: bool,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            version: cart.version().as_i64(),
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineResponse {
                    product_id: line.product_id.to_string(),
                    quantity: line.quantity,
                })
                .collect(),
            total_quantity: cart.total_quantity(),
        }
    }
}

impl From<MergeOutcome> for MergeResponse {
    fn from(outcome: MergeOutcome) -> Self {
        Self {
            cart: CartResponse::from(&outcome.cart),
            merged: outcome.report.merged,
            dropped: outcome
                .report
                .dropped
                .iter()
                .map(ToString::to_string)
                .collect(),
            already_merged: outcome.already_merged,
        }
    }
}

/// GET /cart
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get_cart(&actor).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// DELETE /cart
#[tracing::instrument(skip(state))]
pub async fn clear<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.clear(&actor).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// POST /cart/lines: add to a line, summing with an existing one.
#[tracing::instrument(skip(state, req))]
pub async fn add_line<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(req): Json<AddLineRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id("product", &req.product_id)?;
    let cart = state
        .carts
        .add_line(&actor, product_id, req.quantity)
        .await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// PUT /cart/lines/{product_id}: overwrite a line's quantity; 0 removes it.
#[tracing::instrument(skip(state, req))]
pub async fn set_quantity<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(product_id): Path<String>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id("product", &product_id)?;
    let cart = state
        .carts
        .set_quantity(&actor, product_id, req.quantity)
        .await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// DELETE /cart/lines/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove_line<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id("product", &product_id)?;
    let cart = state.carts.remove_line(&actor, product_id).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// POST /cart/merge: fold an anonymous local cart into the server cart at login.
#[tracing::instrument(skip(state, req))]
pub async fn merge<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, ApiError> {
    let session_id = req
        .session_id
        .as_deref()
        .map(|id| parse_id::<SessionId>("session", id))
        .transpose()?;

    // Zero quantities are kept here so the merge reports them as dropped.
    let local = req
        .lines
        .iter()
        .map(|line| {
            Ok(CartLine {
                product_id: parse_id("product", &line.product_id)?,
                quantity: line.quantity,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let outcome = state.carts.reconcile(&actor, &local, session_id).await?;
    Ok(Json(outcome.into()))
}
