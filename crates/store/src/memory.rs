use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProducerId, ProductId, SessionId, Version};
use domain::{Cart, Catalog, Order, OrderStatus, PaymentUpdate, Product, TransitionPlan};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{MarketStore, sort_newest_first},
};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    carts: HashMap<CustomerId, Cart>,
    merged_sessions: HashSet<(CustomerId, SessionId)>,
    orders: HashMap<OrderId, Order>,
    unavailable: bool,
}

impl State {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable(
                "in-memory store is switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn order_mut(&mut self, order_id: OrderId) -> Result<&mut Order> {
        self.orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))
    }
}

/// In-memory store implementation.
///
/// All data sits behind one lock, so every trait method is trivially atomic.
/// Used by tests and by the API server when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryMarketStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `Unavailable` until switched back.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all data.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.products.clear();
        state.carts.clear();
        state.merged_sessions.clear();
        state.orders.clear();
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available()?;

        if state.products.contains_key(&product.id) {
            return Err(StoreError::DuplicateProduct(product.id));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let stored = state
            .products
            .get_mut(&product.id)
            .ok_or(StoreError::ProductNotFound(product.id))?;
        *stored = product.clone();
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.products.get(&product_id).cloned())
    }

    async fn get_products(&self, product_ids: &[ProductId]) -> Result<Catalog> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(product_ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn list_products(&self, producer_id: Option<ProducerId>) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        state.check_available()?;

        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| producer_id.is_none_or(|id| p.producer_id == id))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn load_cart(&self, customer_id: CustomerId) -> Result<Cart> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.carts.get(&customer_id).cloned().unwrap_or_default())
    }

    async fn save_cart(
        &self,
        customer_id: CustomerId,
        cart: &Cart,
        merged_session: Option<SessionId>,
    ) -> Result<Version> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let actual = state
            .carts
            .get(&customer_id)
            .map(Cart::version)
            .unwrap_or_default();
        if actual != cart.version() {
            return Err(StoreError::ConcurrencyConflict {
                customer_id,
                expected: cart.version(),
                actual,
            });
        }

        if let Some(session_id) = merged_session
            && !state.merged_sessions.insert((customer_id, session_id))
        {
            return Err(StoreError::SessionAlreadyMerged(session_id));
        }

        let next = actual.next();
        let stored = Cart::restore(cart.lines().iter().copied(), next)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        state.carts.insert(customer_id, stored);
        Ok(next)
    }

    async fn is_session_merged(
        &self,
        customer_id: CustomerId,
        session_id: SessionId,
    ) -> Result<bool> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.merged_sessions.contains(&(customer_id, session_id)))
    }

    async fn commit_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available()?;

        // Check every line before touching anything.
        for line in order.lines() {
            let available = state
                .products
                .get(&line.product_id)
                .map(Product::orderable_stock)
                .unwrap_or(0);
            if line.quantity > available {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available,
                });
            }
        }

        for line in order.lines() {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock -= line.quantity;
            }
        }
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn transition_order(&self, plan: &TransitionPlan, at: DateTime<Utc>) -> Result<Order> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let order = state.order_mut(plan.order_id)?;
        if order.status() != plan.from {
            return Err(StoreError::StatusConflict {
                order_id: plan.order_id,
                expected: plan.from,
                actual: order.status(),
            });
        }
        order.apply_transition(plan.to, at);
        let order = order.clone();

        if plan.restock {
            for line in order.lines() {
                if let Some(product) = state.products.get_mut(&line.product_id) {
                    product.stock = product.stock.saturating_add(line.quantity);
                }
            }
        }

        Ok(order)
    }

    async fn set_payment(
        &self,
        order_id: OrderId,
        update: &PaymentUpdate,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let order = state.order_mut(order_id)?;
        if order.status() == OrderStatus::Cancelled {
            return Err(StoreError::OrderCancelled(order_id));
        }
        order.apply_payment(update, at);
        Ok(order.clone())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        state.check_available()?;

        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.customer_id() == customer_id)
            .cloned()
            .collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn orders_for_producer(&self, producer_id: ProducerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        state.check_available()?;

        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.producer_id() == producer_id)
            .cloned()
            .collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }
}
