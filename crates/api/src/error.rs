//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use fulfillment::FulfillmentError;
use projections::QueryError;
use store::StoreError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// No usable caller identity.
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Status code and stable error kind for the response body.
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Fulfillment(err) => (fulfillment_status(err), err.kind()),
            ApiError::Query(err) => query_status(err),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InfrastructureError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, kind, "internal server error");
        }

        let body = serde_json::json!({ "error": kind, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_status(err: &FulfillmentError) -> StatusCode {
    match err {
        FulfillmentError::Cart(_) | FulfillmentError::Product(_) => StatusCode::BAD_REQUEST,
        FulfillmentError::Order(order_err) => match order_err {
            OrderError::EmptyCart
            | OrderError::PickupPointRequired
            | OrderError::AmountOverflow { .. } => StatusCode::BAD_REQUEST,
            OrderError::InsufficientStock { .. } | OrderError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            OrderError::UnauthorizedTransition { .. } => StatusCode::FORBIDDEN,
            OrderError::TotalMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
        FulfillmentError::ProductNotFound(_) | FulfillmentError::OrderNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        FulfillmentError::ProductUnavailable(_) | FulfillmentError::PaymentNotRetryable(_) => {
            StatusCode::CONFLICT
        }
        FulfillmentError::Forbidden(_) => StatusCode::FORBIDDEN,
        FulfillmentError::Store(store_err) => store_status(store_err),
        FulfillmentError::PaymentGateway(_)
        | FulfillmentError::Notification(_)
        | FulfillmentError::CheckoutIncomplete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::ConcurrencyConflict { .. }
        | StoreError::StatusConflict { .. }
        | StoreError::SessionAlreadyMerged(_)
        | StoreError::DuplicateProduct(_)
        | StoreError::OrderCancelled(_)
        | StoreError::InsufficientStock { .. } => StatusCode::CONFLICT,
        StoreError::OrderNotFound(_) | StoreError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn query_status(err: &QueryError) -> (StatusCode, &'static str) {
    match err {
        QueryError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
        QueryError::Store(store_err) => (store_status(store_err), "InfrastructureError"),
        QueryError::Directory(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InfrastructureError"),
    }
}
