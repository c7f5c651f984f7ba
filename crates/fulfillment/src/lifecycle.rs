//! Order lifecycle: checkout commit, status transitions, payment and events.

use std::time::Instant;

use chrono::Utc;
use common::{CustomerId, OrderId, ProductId};
use domain::{
    Actor, CartLine, DomainEvent, Order, OrderError, OrderEvent, OrderStatus, Partition,
    PaymentStatus, PaymentUpdate, TransitionRequest, partition,
};
use futures_util::future::join_all;
use store::{MarketStore, StoreError};

use crate::cart::{CartService, MAX_CART_ATTEMPTS, require_customer};
use crate::checkout::{CheckoutOutcome, CheckoutRequest, GroupFailure, PaymentInstruction};
use crate::config::LifecycleConfig;
use crate::error::{FulfillmentError, Result};
use crate::services::{Notifier, PaymentGateway, PaymentOutcome};

/// Drives orders from checkout to a terminal status.
///
/// Checkout partitions the caller's server cart by producer and commits each
/// group atomically through the store. A group that fails (stock, pricing) is
/// reported without affecting the other groups.
pub struct OrderLifecycle<S, P, N>
where
    S: MarketStore,
    P: PaymentGateway,
    N: Notifier,
{
    store: S,
    carts: CartService<S>,
    payments: P,
    notifier: N,
    config: LifecycleConfig,
}

impl<S, P, N> OrderLifecycle<S, P, N>
where
    S: MarketStore + Clone,
    P: PaymentGateway,
    N: Notifier,
{
    /// Creates a new order lifecycle engine.
    pub fn new(store: S, payments: P, notifier: N, config: LifecycleConfig) -> Self {
        let carts = CartService::new(store.clone());
        Self {
            store,
            carts,
            payments,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Checks out the caller's server cart.
    ///
    /// Creates one order per producer group that passes validation and whose
    /// stock decrement succeeds. The lines of every placeable group are claimed
    /// from the cart with a versioned write before any stock is touched, so two
    /// checkouts of the same cart cannot both commit it. Lines of a group whose
    /// commit then fails go back into the cart. Fails outright only for an
    /// empty cart, an invalid request or a storage failure.
    #[tracing::instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome> {
        let customer_id = require_customer(actor)?;
        metrics::counter!("checkout_requests_total").increment(1);
        let started = Instant::now();

        request.validate()?;

        let (split, drafts) = self.claim_cart(customer_id, &request).await?;

        // Groups touch disjoint products, so their commits can run side by side.
        let results = join_all(drafts.iter().map(|order| self.store.commit_order(order))).await;

        let mut failures: Vec<GroupFailure> =
            split.rejected.into_iter().map(GroupFailure::from).collect();
        let mut committed = Vec::with_capacity(drafts.len());
        let mut unclaimed: Vec<CartLine> = Vec::new();
        let mut infrastructure: Option<StoreError> = None;

        for (order, result) in drafts.into_iter().zip(results) {
            match result {
                Ok(()) => committed.push(order),
                Err(error) => {
                    unclaimed.extend(order.lines().iter().map(|line| CartLine {
                        product_id: line.product_id,
                        quantity: line.quantity,
                    }));
                    match error {
                        StoreError::InsufficientStock {
                            product_id,
                            requested,
                            available,
                        } => failures.push(GroupFailure {
                            producer_id: order.producer_id(),
                            error: OrderError::InsufficientStock {
                                product_id,
                                requested,
                                available,
                            },
                        }),
                        error => {
                            tracing::error!(
                                producer_id = %order.producer_id(),
                                %error,
                                "order commit failed"
                            );
                            if infrastructure.is_none() {
                                infrastructure = Some(error);
                            }
                        }
                    }
                }
            }
        }

        if !unclaimed.is_empty()
            && let Err(error) = self.carts.return_lines(customer_id, &unclaimed).await
        {
            tracing::warn!(%customer_id, %error, "failed to return unordered lines to cart");
        }

        for order in &committed {
            self.notify(OrderEvent::created(order.clone())).await;
        }

        if let PaymentInstruction::Charge { payment_method_id } = &request.payment {
            for order in committed.iter_mut() {
                match self.charge(order, payment_method_id).await {
                    Ok(charged) => *order = charged,
                    Err(error) => {
                        tracing::error!(order_id = %order.id(), %error, "failed to record payment");
                        if let Ok(Some(current)) = self.store.get_order(order.id()).await {
                            *order = current;
                        }
                    }
                }
            }
        }

        metrics::counter!("checkout_orders_created_total").increment(committed.len() as u64);
        metrics::counter!("checkout_group_failures_total").increment(failures.len() as u64);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        if let Some(source) = infrastructure {
            if committed.is_empty() {
                return Err(source.into());
            }
            let orders: Vec<OrderId> = committed.iter().map(Order::id).collect();
            tracing::error!(
                %customer_id,
                orders = ?orders,
                "checkout interrupted after committing orders"
            );
            return Err(FulfillmentError::CheckoutIncomplete { orders, source });
        }

        for failure in &failures {
            tracing::warn!(
                producer_id = %failure.producer_id,
                kind = failure.error.kind(),
                "producer group rejected"
            );
        }
        tracing::info!(
            %customer_id,
            orders = committed.len(),
            failures = failures.len(),
            unknown_products = split.unknown_products.len(),
            "checkout completed"
        );

        Ok(CheckoutOutcome {
            orders: committed,
            failures,
            unknown_products: split.unknown_products,
        })
    }

    /// Loads and partitions the cart, then removes the lines of every
    /// placeable group with a write at the loaded version. A version conflict
    /// means the cart changed underneath (another checkout included), so the
    /// whole step starts over from a fresh load.
    async fn claim_cart(
        &self,
        customer_id: CustomerId,
        request: &CheckoutRequest,
    ) -> Result<(Partition, Vec<Order>)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let cart = self.store.load_cart(customer_id).await?;
            let catalog = self.store.get_products(&cart.product_ids()).await?;
            let mut split = partition(cart.lines(), &catalog)?;

            let placed_at = Utc::now();
            let initial_payment = request.payment.initial_update();
            let drafts: Vec<Order> = std::mem::take(&mut split.drafts)
                .into_iter()
                .map(|draft| {
                    let pickup = request.pickup_for(draft.producer_id());
                    Order::place(
                        OrderId::new(),
                        customer_id,
                        draft,
                        pickup,
                        initial_payment.clone(),
                        placed_at,
                    )
                })
                .collect();

            if drafts.is_empty() {
                return Ok((split, drafts));
            }

            let claimed_ids: Vec<ProductId> = drafts
                .iter()
                .flat_map(|order| order.lines().iter().map(|line| line.product_id))
                .collect();
            let mut claimed = cart;
            claimed.remove_products(&claimed_ids);

            match self.store.save_cart(customer_id, &claimed, None).await {
                Ok(_) => return Ok((split, drafts)),
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < MAX_CART_ATTEMPTS => {
                    tracing::debug!(%customer_id, attempt, "cart changed during checkout, reloading");
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Moves an order along the status machine on behalf of `actor`.
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        actor: &Actor,
        order_id: OrderId,
        request: TransitionRequest,
    ) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        let plan = order.plan_transition(actor, &request, &self.config.cancellation)?;

        let updated = match self.store.transition_order(&plan, Utc::now()).await {
            Ok(updated) => updated,
            // Someone else moved the order first; judge the request against the new status.
            Err(StoreError::StatusConflict { actual, .. }) => {
                return Err(OrderError::InvalidTransition {
                    from: actual,
                    to: plan.to,
                }
                .into());
            }
            Err(error) => return Err(error.into()),
        };

        metrics::counter!(
            "order_transitions_total",
            "from" => plan.from.as_str(),
            "to" => plan.to.as_str()
        )
        .increment(1);
        tracing::info!(
            %order_id,
            from = %plan.from,
            to = %plan.to,
            restock = plan.restock,
            actor = %actor,
            "order status changed"
        );

        self.notify(OrderEvent::status_changed(updated.clone(), plan.from))
            .await;
        Ok(updated)
    }

    /// Cancels an order. `restock` only matters for producer cancellations.
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
        restock: Option<bool>,
    ) -> Result<Order> {
        self.transition(actor, order_id, TransitionRequest::cancel(restock))
            .await
    }

    /// Charges an order again after a failed or skipped payment.
    #[tracing::instrument(skip(self, payment_method_id))]
    pub async fn retry_payment(
        &self,
        actor: &Actor,
        order_id: OrderId,
        payment_method_id: String,
    ) -> Result<Order> {
        require_customer(actor)?;
        let order = self.get_order(actor, order_id).await?;

        if order.status() == OrderStatus::Cancelled {
            return Err(FulfillmentError::PaymentNotRetryable(format!(
                "order {order_id} is cancelled"
            )));
        }
        if order.payment_status() == PaymentStatus::Paid {
            return Err(FulfillmentError::PaymentNotRetryable(format!(
                "order {order_id} is already paid"
            )));
        }

        self.charge(&order, &payment_method_id).await
    }

    /// Returns an order if `actor` is its customer or producer.
    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .filter(|order| order.is_visible_to(actor))
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }

    /// Runs one bounded charge attempt and records its result on the order.
    ///
    /// A gateway error or timeout is recorded as `failed`; the order itself is
    /// never rolled back. Nothing is recorded on an order cancelled meanwhile.
    async fn charge(&self, order: &Order, payment_method_id: &str) -> Result<Order> {
        metrics::counter!("payment_attempts_total").increment(1);

        let attempt = async {
            let intent_id = self
                .payments
                .create_payment_intent(order.total(), &self.config.currency)
                .await?;
            let outcome = self.payments.confirm(&intent_id, payment_method_id).await?;
            Ok::<_, FulfillmentError>((intent_id, outcome))
        };

        let (status, payment_intent_id) =
            match tokio::time::timeout(self.config.payment_timeout, attempt).await {
                Ok(Ok((intent_id, PaymentOutcome::Paid))) => (PaymentStatus::Paid, Some(intent_id)),
                Ok(Ok((intent_id, PaymentOutcome::Failed))) => {
                    tracing::warn!(order_id = %order.id(), %intent_id, "payment declined");
                    (PaymentStatus::Failed, Some(intent_id))
                }
                Ok(Err(error)) => {
                    tracing::warn!(order_id = %order.id(), %error, "payment gateway error");
                    (PaymentStatus::Failed, None)
                }
                Err(_) => {
                    tracing::warn!(
                        order_id = %order.id(),
                        timeout_ms = self.config.payment_timeout.as_millis() as u64,
                        "payment timed out"
                    );
                    (PaymentStatus::Failed, None)
                }
            };

        if status == PaymentStatus::Failed {
            metrics::counter!("payment_failures_total").increment(1);
        }

        let update = PaymentUpdate {
            status,
            payment_intent_id,
            payment_method_id: Some(payment_method_id.to_string()),
        };
        match self.store.set_payment(order.id(), &update, Utc::now()).await {
            Ok(updated) => Ok(updated),
            // The order was cancelled while the gateway call was in flight.
            Err(StoreError::OrderCancelled(order_id)) => {
                tracing::warn!(
                    %order_id,
                    payment_intent_id = ?update.payment_intent_id,
                    payment_status = %update.status,
                    "payment settled after the order was cancelled"
                );
                metrics::counter!("payment_after_cancel_total").increment(1);
                Err(FulfillmentError::PaymentNotRetryable(format!(
                    "order {order_id} was cancelled during payment"
                )))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn notify(&self, event: OrderEvent) {
        if let Err(error) = self.notifier.publish(&event).await {
            tracing::warn!(
                event_type = event.event_type(),
                order_id = %event.order().id(),
                %error,
                "notification failed"
            );
        }
    }
}
