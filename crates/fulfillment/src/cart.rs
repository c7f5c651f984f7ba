//! Server cart operations and login-time reconciliation.

use common::{CustomerId, ProductId, SessionId};
use domain::{Actor, Cart, CartLine, ReconcileReport, Role, reconcile};
use store::{MarketStore, StoreError};

use crate::error::{FulfillmentError, Result};

/// Attempts for a cart write that keeps losing the version race.
pub(crate) const MAX_CART_ATTEMPTS: u32 = 3;

/// Result of merging an anonymous cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub cart: Cart,
    pub report: ReconcileReport,

    /// The session had been merged before; nothing was changed.
    pub already_merged: bool,
}

/// Service for a customer's server cart.
#[derive(Clone)]
pub struct CartService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, actor: &Actor) -> Result<Cart> {
        let customer_id = require_customer(actor)?;
        Ok(self.store.load_cart(customer_id).await?)
    }

    /// Adds `quantity` of a product, summing with an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn add_line(
        &self,
        actor: &Actor,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let customer_id = require_customer(actor)?;
        CartLine::new(product_id, quantity)?;
        self.require_orderable(product_id).await?;

        self.update(customer_id, |cart| Ok(cart.add_line(product_id, quantity)?))
            .await
    }

    /// Sets a line's quantity; zero removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        actor: &Actor,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let customer_id = require_customer(actor)?;
        if quantity > 0 {
            self.require_orderable(product_id).await?;
        }

        self.update(customer_id, |cart| {
            cart.set_quantity(product_id, quantity);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, actor: &Actor, product_id: ProductId) -> Result<Cart> {
        let customer_id = require_customer(actor)?;
        self.update(customer_id, |cart| {
            cart.remove_line(&product_id);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, actor: &Actor) -> Result<Cart> {
        let customer_id = require_customer(actor)?;
        self.update(customer_id, |cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    /// Merges an anonymous cart into the customer's server cart.
    ///
    /// Quantities for products on both sides are summed. Lines for unknown or
    /// archived products are dropped without aborting the merge. When a session
    /// id is given, a second merge of the same session changes nothing.
    #[tracing::instrument(skip(self, local), fields(local_lines = local.len()))]
    pub async fn reconcile(
        &self,
        actor: &Actor,
        local: &[CartLine],
        session_id: Option<SessionId>,
    ) -> Result<MergeOutcome> {
        let customer_id = require_customer(actor)?;

        if let Some(session_id) = session_id
            && self.store.is_session_merged(customer_id, session_id).await?
        {
            return self.already_merged(customer_id).await;
        }

        let product_ids: Vec<ProductId> = local.iter().map(|line| line.product_id).collect();
        let catalog = self.store.get_products(&product_ids).await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut cart = self.store.load_cart(customer_id).await?;
            let report = reconcile(&mut cart, local, &catalog);

            match self.store.save_cart(customer_id, &cart, session_id).await {
                Ok(version) => {
                    cart.mark_saved(version);
                    metrics::counter!("cart_reconciliations_total").increment(1);
                    metrics::counter!("cart_lines_dropped_total")
                        .increment(report.dropped.len() as u64);
                    tracing::info!(
                        %customer_id,
                        merged = report.merged,
                        dropped = report.dropped.len(),
                        "cart reconciled"
                    );
                    return Ok(MergeOutcome {
                        cart,
                        report,
                        already_merged: false,
                    });
                }
                Err(StoreError::SessionAlreadyMerged(_)) => {
                    return self.already_merged(customer_id).await;
                }
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < MAX_CART_ATTEMPTS => {
                    tracing::debug!(%customer_id, attempt, "cart version conflict, retrying merge");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Puts lines taken by a checkout back into a customer's cart, summing with
    /// whatever was added in the meantime.
    pub(crate) async fn return_lines(
        &self,
        customer_id: CustomerId,
        lines: &[CartLine],
    ) -> Result<Cart> {
        self.update(customer_id, |cart| {
            for line in lines {
                if let Err(error) = cart.add_line(line.product_id, line.quantity) {
                    tracing::warn!(
                        %customer_id,
                        product_id = %line.product_id,
                        %error,
                        "line could not be returned to cart"
                    );
                }
            }
            Ok(())
        })
        .await
    }

    async fn already_merged(&self, customer_id: CustomerId) -> Result<MergeOutcome> {
        tracing::info!(%customer_id, "session already merged");
        Ok(MergeOutcome {
            cart: self.store.load_cart(customer_id).await?,
            report: ReconcileReport::default(),
            already_merged: true,
        })
    }

    async fn require_orderable(&self, product_id: ProductId) -> Result<()> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(FulfillmentError::ProductNotFound(product_id))?;
        if !product.available {
            return Err(FulfillmentError::ProductUnavailable(product_id));
        }
        Ok(())
    }

    /// Load, edit, save; retried on a version conflict.
    async fn update<F>(&self, customer_id: CustomerId, mut edit: F) -> Result<Cart>
    where
        F: FnMut(&mut Cart) -> Result<()>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut cart = self.store.load_cart(customer_id).await?;
            edit(&mut cart)?;

            match self.store.save_cart(customer_id, &cart, None).await {
                Ok(version) => {
                    cart.mark_saved(version);
                    return Ok(cart);
                }
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < MAX_CART_ATTEMPTS => {
                    tracing::debug!(%customer_id, attempt, "cart version conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

pub(crate) fn require_customer(actor: &Actor) -> Result<CustomerId> {
    actor
        .customer_id()
        .ok_or_else(|| FulfillmentError::wrong_role(actor, Role::Customer, "cart access"))
}
