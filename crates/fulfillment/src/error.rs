//! Service error types.

use common::{OrderId, ProductId};
use domain::{Actor, CartError, OrderError, ProductError, Role};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during cart, catalog and order operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Invalid cart edit.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Checkout or status change rejected by the order rules.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Invalid product input.
    #[error(transparent)]
    Product(#[from] ProductError),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but was archived by its producer.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(ProductId),

    /// The order does not exist or is not visible to the caller.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The caller's role or ownership does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A payment cannot be attempted for the order in its current state.
    #[error("Payment not retryable: {0}")]
    PaymentNotRetryable(String),

    /// Payment collaborator error.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// Notification collaborator error.
    #[error("Notification error: {0}")]
    Notification(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// A storage failure hit one producer group after others were committed.
    /// The committed orders stand.
    #[error("Checkout interrupted after committing orders [{}]: {source}", join_ids(.orders))]
    CheckoutIncomplete {
        orders: Vec<OrderId>,
        source: StoreError,
    },
}

fn join_ids(ids: &[OrderId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<StoreError> for FulfillmentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => FulfillmentError::Order(OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            }),
            StoreError::OrderNotFound(id) => FulfillmentError::OrderNotFound(id),
            StoreError::ProductNotFound(id) => FulfillmentError::ProductNotFound(id),
            other => FulfillmentError::Store(other),
        }
    }
}

impl FulfillmentError {
    /// Stable error kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::Cart(e) => e.kind(),
            FulfillmentError::Order(e) => e.kind(),
            FulfillmentError::Product(_) => "InvalidProduct",
            FulfillmentError::ProductNotFound(_) => "ProductNotFound",
            FulfillmentError::ProductUnavailable(_) => "ProductUnavailable",
            FulfillmentError::OrderNotFound(_) => "OrderNotFound",
            FulfillmentError::Forbidden(_) => "Forbidden",
            FulfillmentError::PaymentNotRetryable(_) => "PaymentNotRetryable",
            FulfillmentError::PaymentGateway(_) => "PaymentGatewayError",
            FulfillmentError::Notification(_) => "NotificationError",
            FulfillmentError::CheckoutIncomplete { .. } => "InfrastructureError",
            FulfillmentError::Store(e) => match e {
                StoreError::ConcurrencyConflict { .. } | StoreError::StatusConflict { .. } => {
                    "ConcurrencyConflict"
                }
                StoreError::SessionAlreadyMerged(_) => "SessionAlreadyMerged",
                StoreError::OrderCancelled(_) => "OrderCancelled",
                StoreError::DuplicateProduct(_) => "DuplicateProduct",
                _ => "InfrastructureError",
            },
        }
    }

    /// True for storage failures, which are never retried inside the core.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            FulfillmentError::Store(e) => e.is_infrastructure(),
            FulfillmentError::CheckoutIncomplete { .. } => true,
            _ => false,
        }
    }

    pub(crate) fn wrong_role(actor: &Actor, required: Role, action: &str) -> Self {
        FulfillmentError::Forbidden(format!(
            "{action} requires role {required}, caller is {}",
            actor.role()
        ))
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
