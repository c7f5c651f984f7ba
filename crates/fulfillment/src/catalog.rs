//! Thin product CRUD for producers.

use common::{ProducerId, ProductId};
use domain::{Actor, NewProduct, Product, Role};
use store::MarketStore;

use crate::error::{FulfillmentError, Result};

/// Service for the product catalog.
#[derive(Clone)]
pub struct CatalogService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a product owned by the calling producer.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, actor: &Actor, input: NewProduct) -> Result<Product> {
        let producer_id = require_producer(actor, "creating a product")?;
        let product = Product::create(producer_id, input)?;
        self.store.insert_product(&product).await?;

        tracing::info!(product_id = %product.id, %producer_id, "product created");
        Ok(product)
    }

    /// Sets the absolute stock level of one of the caller's products.
    #[tracing::instrument(skip(self))]
    pub async fn set_stock(
        &self,
        actor: &Actor,
        product_id: ProductId,
        stock: u32,
    ) -> Result<Product> {
        let mut product = self.owned_product(actor, product_id).await?;
        product.stock = stock;
        self.store.update_product(&product).await?;
        Ok(product)
    }

    /// Archives one of the caller's products. Existing orders keep their lines.
    #[tracing::instrument(skip(self))]
    pub async fn archive_product(&self, actor: &Actor, product_id: ProductId) -> Result<Product> {
        let mut product = self.owned_product(actor, product_id).await?;
        product.available = false;
        self.store.update_product(&product).await?;

        tracing::info!(%product_id, "product archived");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or(FulfillmentError::ProductNotFound(product_id))
    }

    /// Lists products that can still be ordered.
    pub async fn list_products(&self, producer_id: Option<ProducerId>) -> Result<Vec<Product>> {
        let mut products = self.store.list_products(producer_id).await?;
        products.retain(|p| p.available);
        Ok(products)
    }

    async fn owned_product(&self, actor: &Actor, product_id: ProductId) -> Result<Product> {
        let producer_id = require_producer(actor, "editing a product")?;
        let product = self.get_product(product_id).await?;
        if product.producer_id != producer_id {
            return Err(FulfillmentError::Forbidden(format!(
                "product {product_id} belongs to another producer"
            )));
        }
        Ok(product)
    }
}

fn require_producer(actor: &Actor, action: &str) -> Result<ProducerId> {
    actor
        .producer_id()
        .ok_or_else(|| FulfillmentError::wrong_role(actor, Role::Producer, action))
}
