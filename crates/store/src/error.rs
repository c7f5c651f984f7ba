use common::{CustomerId, OrderId, ProductId, SessionId, Version};
use domain::OrderStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional stock decrement failed during order commit.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The order was no longer in the status the change was planned from.
    #[error("Order {order_id} status changed concurrently: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The cart was written by someone else since it was loaded.
    #[error(
        "Concurrency conflict for cart of {customer_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        customer_id: CustomerId,
        expected: Version,
        actual: Version,
    },

    /// The anonymous session was already merged into this customer's cart.
    #[error("Session {0} was already merged")]
    SessionAlreadyMerged(SessionId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Payments are no longer recorded on a cancelled order.
    #[error("Order {0} is cancelled")]
    OrderCancelled(OrderId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product already exists: {0}")]
    DuplicateProduct(ProductId),

    /// A persisted row no longer satisfies a domain invariant.
    #[error("Corrupt stored data: {0}")]
    Decode(String),

    /// The backing store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True for failures of the storage itself rather than of the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            StoreError::Decode(_)
                | StoreError::Unavailable(_)
                | StoreError::Database(_)
                | StoreError::Migration(_)
                | StoreError::Serialization(_)
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
