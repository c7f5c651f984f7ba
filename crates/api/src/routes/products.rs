//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ProducerId, ProductId};
use domain::{NewProduct, Product};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use super::{parse_id, parse_money};
use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    /// Decimal amount, e.g. `"3.50"`.
    pub price: String,
    pub stock: u32,
    pub unit: String,
    pub category: String,
}

#[derive(Deserialize)]
pub struct SetStockRequest {
    pub stock: u32,
}

#[derive(Deserialize)]
pub struct ListProductsQuery {
    pub producer_id: Option<String>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub producer_id: String,
    pub name: String,
    pub price_cents: i64,
    pub price: String,
    pub stock: u32,
    pub unit: String,
    pub category: String,
    pub available: bool,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            producer_id: product.producer_id.to_string(),
            name: product.name,
            price_cents: product.price.cents(),
            price: product.price.to_string(),
            stock: product.stock,
            unit: product.unit,
            category: product.category,
            available: product.available,
        }
    }
}

/// GET /products: list orderable products, optionally for one producer.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let producer_id = query
        .producer_id
        .as_deref()
        .map(|id| parse_id::<ProducerId>("producer", id))
        .transpose()?;

    let products = state.catalog.list_products(producer_id).await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// POST /products: create a product owned by the calling producer.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let input = NewProduct {
        name: req.name,
        price: parse_money("price", &req.price)?,
        stock: req.stock,
        unit: req.unit,
        category: req.category,
    };

    let product = state.catalog.create_product(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id("product", &id)?;
    let product = state.catalog.get_product(product_id).await?;
    Ok(Json(product.into()))
}

/// PUT /products/{id}/stock: set the absolute stock level.
#[tracing::instrument(skip(state, req))]
pub async fn set_stock<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(req): Json<SetStockRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id("product", &id)?;
    let product = state
        .catalog
        .set_stock(&actor, product_id, req.stock)
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}: archive the product.
#[tracing::instrument(skip(state))]
pub async fn archive<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id("product", &id)?;
    let product = state.catalog.archive_product(&actor, product_id).await?;
    Ok(Json(product.into()))
}
