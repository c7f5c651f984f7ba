//! Shopping carts.

mod lines;
mod reconcile;

pub use lines::{Cart, CartLine};
pub use reconcile::{ReconcileReport, reconcile};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur while editing a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity must be greater than 0.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Adding to an existing line would overflow its quantity.
    #[error("Quantity overflow for product {product_id}")]
    QuantityOverflow { product_id: ProductId },
}

impl CartError {
    /// Stable error kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            CartError::InvalidQuantity { .. } | CartError::QuantityOverflow { .. } => {
                "InvalidQuantity"
            }
        }
    }
}
