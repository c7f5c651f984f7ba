//! Products and the catalog snapshot used during checkout.

use std::collections::HashMap;

use common::{Money, ProducerId, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when creating or editing a product.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// Price must be strictly positive.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: i64 },

    /// Product name must not be blank.
    #[error("Product name is required")]
    NameRequired,
}

/// A product offered by exactly one producer.
///
/// `stock` is only ever changed by order commit/cancellation and by the owning
/// producer's explicit restock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub producer_id: ProducerId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub unit: String,
    pub category: String,
    /// False once the producer archived the product.
    pub available: bool,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub unit: String,
    pub category: String,
}

impl Product {
    /// Validates the input and creates an available product owned by `producer_id`.
    pub fn create(producer_id: ProducerId, input: NewProduct) -> Result<Self, ProductError> {
        if input.name.trim().is_empty() {
            return Err(ProductError::NameRequired);
        }
        if !input.price.is_positive() {
            return Err(ProductError::InvalidPrice {
                price: input.price.cents(),
            });
        }

        Ok(Self {
            id: ProductId::new(),
            producer_id,
            name: input.name.trim().to_string(),
            price: input.price,
            stock: input.stock,
            unit: input.unit,
            category: input.category,
            available: true,
        })
    }

    /// Returns the stock that can still be ordered (0 for archived products).
    pub fn orderable_stock(&self) -> u32 {
        if self.available { self.stock } else { 0 }
    }
}

/// A read snapshot of products keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: HashMap<ProductId, Product>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn get(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.get(product_id)
    }

    /// Returns the product only if it exists and has not been archived.
    pub fn available(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.get(product_id).filter(|p| p.available)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for Catalog {
    fn from_iter<T: IntoIterator<Item = Product>>(iter: T) -> Self {
        Self {
            products: iter.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}
