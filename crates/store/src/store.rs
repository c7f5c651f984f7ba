use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProducerId, ProductId, SessionId, Version};
use domain::{Cart, Catalog, Order, PaymentUpdate, Product, TransitionPlan};

use crate::Result;

/// Core trait for marketplace storage.
///
/// All implementations must be thread-safe (Send + Sync) and must make each
/// method atomic with respect to every other method.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Inserts a new product. Fails with `DuplicateProduct` if the id exists.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Replaces a product's editable fields (name, price, stock, unit,
    /// category, availability). Fails with `ProductNotFound`.
    async fn update_product(&self, product: &Product) -> Result<()>;

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Loads a snapshot of the given products. Missing ids are simply absent.
    async fn get_products(&self, product_ids: &[ProductId]) -> Result<Catalog>;

    /// Lists products, optionally restricted to one producer, ordered by name.
    async fn list_products(&self, producer_id: Option<ProducerId>) -> Result<Vec<Product>>;

    /// Loads a customer's cart. A customer without a stored cart gets an empty
    /// cart at `Version::initial()`.
    async fn load_cart(&self, customer_id: CustomerId) -> Result<Cart>;

    /// Writes a cart if the stored version still equals `cart.version()`.
    ///
    /// When `merged_session` is set, the session is recorded as merged in the
    /// same write; a session that was already recorded fails with
    /// `SessionAlreadyMerged` and nothing is written. Returns the new version.
    async fn save_cart(
        &self,
        customer_id: CustomerId,
        cart: &Cart,
        merged_session: Option<SessionId>,
    ) -> Result<Version>;

    async fn is_session_merged(&self, customer_id: CustomerId, session_id: SessionId)
    -> Result<bool>;

    /// Persists a new order and decrements stock for each of its lines.
    ///
    /// Each decrement is conditional on the product being available with
    /// enough stock. If any line fails, nothing is written and the error is
    /// `InsufficientStock`.
    async fn commit_order(&self, order: &Order) -> Result<()>;

    /// Applies a planned status change if the order is still in `plan.from`.
    ///
    /// Fails with `StatusConflict` otherwise. When `plan.restock` is set, every
    /// line's quantity is returned to its product's stock in the same write.
    async fn transition_order(&self, plan: &TransitionPlan, at: DateTime<Utc>) -> Result<Order>;

    /// Records a payment outcome on an order.
    ///
    /// Fails with `OrderCancelled` once the order is `CANCELLED`; the check and
    /// the write happen together.
    async fn set_payment(
        &self,
        order_id: OrderId,
        update: &PaymentUpdate,
        at: DateTime<Utc>,
    ) -> Result<Order>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Orders placed by a customer, newest first.
    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// Orders addressed to a producer, newest first.
    async fn orders_for_producer(&self, producer_id: ProducerId) -> Result<Vec<Order>>;
}

/// Sorts orders newest first, breaking ties by id so listings are stable.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
}
