use common::{ProductId, Version};
use serde::{Deserialize, Serialize};

use super::CartError;

/// One cart line: a product reference and a positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a line, rejecting a zero quantity.
    pub fn new(product_id: ProductId, quantity: u32) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }
        Ok(Self {
            product_id,
            quantity,
        })
    }
}

/// An ordered collection of lines, keyed by product.
///
/// Invariant: no two lines reference the same product. Lines keep their
/// insertion order so the cart renders stably.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,

    /// Version of the persisted cart this value was loaded from.
    #[serde(default)]
    version: Version,
}

impl Cart {
    /// Creates an empty, never persisted cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from persisted lines.
    ///
    /// Duplicate products are merged by summing quantities so the invariant holds
    /// even if the source did not enforce it.
    pub fn restore(
        lines: impl IntoIterator<Item = CartLine>,
        version: Version,
    ) -> Result<Self, CartError> {
        let mut cart = Cart {
            lines: Vec::new(),
            version,
        };
        for line in lines {
            cart.add_line(line.product_id, line.quantity)?;
        }
        Ok(cart)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Records the version storage assigned to this cart on its last write.
    pub fn mark_saved(&mut self, version: Version) {
        self.version = version;
    }

    /// Adds `quantity` of a product, summing with an existing line if present.
    pub fn add_line(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        match self.position(&product_id) {
            Some(idx) => {
                let line = &mut self.lines[idx];
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::QuantityOverflow { product_id })?;
            }
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
        Ok(())
    }

    /// Sets the quantity of a product. Zero removes the line; an absent product
    /// gets a new line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_line(&product_id);
            return;
        }

        match self.position(&product_id) {
            Some(idx) => self.lines[idx].quantity = quantity,
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Removes the line for a product. Returns false if there was none.
    pub fn remove_line(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        self.lines.len() != before
    }

    /// Removes every line whose product is in `product_ids`.
    pub fn remove_products(&mut self, product_ids: &[ProductId]) {
        self.lines
            .retain(|line| !product_ids.contains(&line.product_id));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.position(product_id).map(|idx| self.lines[idx].quantity)
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|line| line.product_id).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| &line.product_id == product_id)
    }
}
