//! Orders: partitioning, the order record, its status machine and events.

mod events;
mod model;
mod partition;
mod status;
mod transition;

pub use events::{
    DomainEvent, OrderCreatedData, OrderEvent, OrderStatusChangedData, Recipient,
};
pub use model::{Order, OrderLine, OrderParts, PaymentUpdate, PickupSelection};
pub use partition::{GroupRejection, OrderDraft, Partition, partition};
pub use status::{OrderStatus, PaymentStatus};
pub use transition::{CancellationPolicy, TransitionPlan, TransitionRequest};

use common::{Money, OrderId, ProducerId, ProductId};
use thiserror::Error;

/// Errors that can occur during checkout and order status changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The checkout produced no producer group.
    #[error("Cart is empty")]
    EmptyCart,

    /// A line asks for more than the product has in stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The requested status change is not an edge of the state machine.
    #[error("Invalid transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The caller is not allowed to perform this status change.
    #[error("Unauthorized transition: caller may not move order from {from} to {to}")]
    UnauthorizedTransition { from: OrderStatus, to: OrderStatus },

    /// A line total or order total does not fit in the money type.
    #[error("Order amount overflow for producer {producer_id}")]
    AmountOverflow { producer_id: ProducerId },

    /// A persisted order no longer satisfies its total invariant.
    #[error("Order {order_id} total {stored} does not match its lines ({computed})")]
    TotalMismatch {
        order_id: OrderId,
        stored: Money,
        computed: Money,
    },

    /// Pickup point must be provided.
    #[error("Pickup point is required")]
    PickupPointRequired,
}

impl OrderError {
    /// Stable error kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::EmptyCart => "EmptyCartError",
            OrderError::InsufficientStock { .. } => "InsufficientStockError",
            OrderError::InvalidTransition { .. } => "InvalidTransitionError",
            OrderError::UnauthorizedTransition { .. } => "UnauthorizedTransitionError",
            OrderError::AmountOverflow { .. } => "AmountOverflowError",
            OrderError::TotalMismatch { .. } => "TotalMismatchError",
            OrderError::PickupPointRequired => "PickupPointRequired",
        }
    }
}
