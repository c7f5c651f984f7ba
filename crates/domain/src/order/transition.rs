//! Actor-aware planning of order status changes.

use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{Order, OrderError, OrderStatus};
use crate::actor::Actor;

/// Whether a producer-initiated cancellation puts stock back by default.
///
/// A customer cancelling a pending order always restocks. For producers the
/// default depends on how far the order had progressed; an explicit request
/// flag overrides it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    pub producer_restocks_pending: bool,
    pub producer_restocks_preparing: bool,
}

impl CancellationPolicy {
    fn producer_default(&self, from: OrderStatus) -> bool {
        match from {
            OrderStatus::Pending => self.producer_restocks_pending,
            OrderStatus::Preparing => self.producer_restocks_preparing,
            _ => false,
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub target: OrderStatus,

    /// Explicit restock choice for a producer cancellation.
    #[serde(default)]
    pub restock: Option<bool>,
}

impl TransitionRequest {
    pub fn to(target: OrderStatus) -> Self {
        Self {
            target,
            restock: None,
        }
    }

    pub fn cancel(restock: Option<bool>) -> Self {
        Self {
            target: OrderStatus::Cancelled,
            restock,
        }
    }
}

/// A validated status change, ready to be applied by storage.
///
/// Storage applies it only if the order is still in `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,

    /// Return every line's quantity to its product's stock.
    pub restock: bool,
}

impl Order {
    /// Validates a status change for `actor` against the current status.
    ///
    /// Only the order's producer or customer may change it, the change must be
    /// an edge of the status machine, and a customer may only cancel a pending
    /// order.
    pub fn plan_transition(
        &self,
        actor: &Actor,
        request: &TransitionRequest,
        policy: &CancellationPolicy,
    ) -> Result<TransitionPlan, OrderError> {
        let from = self.status();
        let to = request.target;

        if !self.is_visible_to(actor) {
            return Err(OrderError::UnauthorizedTransition { from, to });
        }

        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        let restock = match actor {
            Actor::Customer(_) => {
                if from != OrderStatus::Pending || to != OrderStatus::Cancelled {
                    return Err(OrderError::UnauthorizedTransition { from, to });
                }
                true
            }
            Actor::Producer(_) if to == OrderStatus::Cancelled => request
                .restock
                .unwrap_or_else(|| policy.producer_default(from)),
            Actor::Producer(_) => false,
        };

        Ok(TransitionPlan {
            order_id: self.id(),
            from,
            to,
            restock,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{CustomerId, Money, ProducerId, ProductId};

    use super::*;
    use crate::order::{OrderDraft, OrderLine, PaymentUpdate, PickupSelection};

    fn order_in(status: OrderStatus) -> Order {
        let draft = OrderDraft::new(
            ProducerId::new(),
            vec![OrderLine {
                product_id: ProductId::new(),
                product_name: "Cheese".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(450),
            }],
        )
        .unwrap();
        let mut order = Order::place(
            OrderId::new(),
            CustomerId::new(),
            draft,
            PickupSelection::new("Market hall", None),
            PaymentUpdate::pending(),
            Utc::now(),
        );
        order.apply_transition(status, Utc::now());
        order
    }

    fn producer(order: &Order) -> Actor {
        Actor::Producer(order.producer_id())
    }

    fn customer(order: &Order) -> Actor {
        Actor::Customer(order.customer_id())
    }

    #[test]
    fn producer_walks_the_happy_path() {
        let policy = CancellationPolicy::default();
        for (from, to) in [
            (OrderStatus::Pending, OrderStatus::Preparing),
            (OrderStatus::Preparing, OrderStatus::Ready),
            (OrderStatus::Ready, OrderStatus::PickedUp),
        ] {
            let order = order_in(from);
            let plan = order
                .plan_transition(&producer(&order), &TransitionRequest::to(to), &policy)
                .unwrap();
            assert_eq!(plan.from, from);
            assert_eq!(plan.to, to);
            assert!(!plan.restock);
        }
    }

    #[test]
    fn skipping_a_step_is_invalid() {
        let order = order_in(OrderStatus::Pending);
        let result = order.plan_transition(
            &producer(&order),
            &TransitionRequest::to(OrderStatus::PickedUp),
            &CancellationPolicy::default(),
        );
        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::PickedUp,
            })
        );
    }

    #[test]
    fn cancelling_a_ready_order_is_invalid() {
        let order = order_in(OrderStatus::Ready);
        let result = order.plan_transition(
            &producer(&order),
            &TransitionRequest::cancel(None),
            &CancellationPolicy::default(),
        );
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }

    #[test]
    fn terminal_orders_cannot_move() {
        for status in [OrderStatus::PickedUp, OrderStatus::Cancelled] {
            let order = order_in(status);
            for to in OrderStatus::all() {
                let result = order.plan_transition(
                    &producer(&order),
                    &TransitionRequest::to(to),
                    &CancellationPolicy::default(),
                );
                assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
            }
        }
    }

    #[test]
    fn other_producer_is_unauthorized() {
        let order = order_in(OrderStatus::Pending);
        let result = order.plan_transition(
            &Actor::Producer(ProducerId::new()),
            &TransitionRequest::to(OrderStatus::Preparing),
            &CancellationPolicy::default(),
        );
        assert!(matches!(
            result,
            Err(OrderError::UnauthorizedTransition { .. })
        ));
    }

    #[test]
    fn customer_may_cancel_pending_with_restock() {
        let order = order_in(OrderStatus::Pending);
        let plan = order
            .plan_transition(
                &customer(&order),
                &TransitionRequest::cancel(Some(false)),
                &CancellationPolicy::default(),
            )
            .unwrap();
        assert_eq!(plan.to, OrderStatus::Cancelled);
        assert!(plan.restock);
    }

    #[test]
    fn customer_may_not_cancel_preparing_or_advance() {
        let preparing = order_in(OrderStatus::Preparing);
        let result = preparing.plan_transition(
            &customer(&preparing),
            &TransitionRequest::cancel(None),
            &CancellationPolicy::default(),
        );
        assert!(matches!(
            result,
            Err(OrderError::UnauthorizedTransition { .. })
        ));

        let pending = order_in(OrderStatus::Pending);
        let result = pending.plan_transition(
            &customer(&pending),
            &TransitionRequest::to(OrderStatus::Preparing),
            &CancellationPolicy::default(),
        );
        assert!(matches!(
            result,
            Err(OrderError::UnauthorizedTransition { .. })
        ));
    }

    #[test]
    fn producer_cancel_restock_follows_policy_unless_overridden() {
        let policy = CancellationPolicy {
            producer_restocks_pending: true,
            producer_restocks_preparing: false,
        };

        let pending = order_in(OrderStatus::Pending);
        let plan = pending
            .plan_transition(&producer(&pending), &TransitionRequest::cancel(None), &policy)
            .unwrap();
        assert!(plan.restock);

        let preparing = order_in(OrderStatus::Preparing);
        let plan = preparing
            .plan_transition(&producer(&preparing), &TransitionRequest::cancel(None), &policy)
            .unwrap();
        assert!(!plan.restock);

        let plan = preparing
            .plan_transition(
                &producer(&preparing),
                &TransitionRequest::cancel(Some(true)),
                &policy,
            )
            .unwrap();
        assert!(plan.restock);
    }
}
