//! Checkout request and outcome types.

use std::collections::HashMap;

use common::{ProducerId, ProductId};
use domain::{GroupRejection, Order, OrderError, PaymentStatus, PaymentUpdate, PickupSelection};
use serde::{Deserialize, Serialize};

/// How the orders of a checkout are paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentInstruction {
    /// Paid at pickup; orders start with payment status `pending`.
    #[default]
    OnPickup,

    /// The client already confirmed the payment; orders start `paid`.
    Confirmed {
        payment_intent_id: String,
        payment_method_id: String,
    },

    /// Each committed order is charged through the payment gateway.
    Charge { payment_method_id: String },
}

impl PaymentInstruction {
    /// Payment fields an order is committed with.
    pub fn initial_update(&self) -> PaymentUpdate {
        match self {
            PaymentInstruction::OnPickup => PaymentUpdate::pending(),
            PaymentInstruction::Confirmed {
                payment_intent_id,
                payment_method_id,
            } => PaymentUpdate {
                status: PaymentStatus::Paid,
                payment_intent_id: Some(payment_intent_id.clone()),
                payment_method_id: Some(payment_method_id.clone()),
            },
            PaymentInstruction::Charge { payment_method_id } => PaymentUpdate {
                status: PaymentStatus::Pending,
                payment_intent_id: None,
                payment_method_id: Some(payment_method_id.clone()),
            },
        }
    }
}

/// A checkout of the caller's server cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Pickup used for every producer without an override.
    pub pickup: PickupSelection,
    pub pickup_overrides: HashMap<ProducerId, PickupSelection>,
    pub payment: PaymentInstruction,
}

impl CheckoutRequest {
    pub fn new(pickup: PickupSelection) -> Self {
        Self {
            pickup,
            pickup_overrides: HashMap::new(),
            payment: PaymentInstruction::OnPickup,
        }
    }

    pub fn with_payment(mut self, payment: PaymentInstruction) -> Self {
        self.payment = payment;
        self
    }

    pub fn with_pickup_override(
        mut self,
        producer_id: ProducerId,
        pickup: PickupSelection,
    ) -> Self {
        self.pickup_overrides.insert(producer_id, pickup);
        self
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        self.pickup.validate()?;
        self.pickup_overrides
            .values()
            .try_for_each(PickupSelection::validate)
    }

    pub fn pickup_for(&self, producer_id: ProducerId) -> PickupSelection {
        self.pickup_overrides
            .get(&producer_id)
            .unwrap_or(&self.pickup)
            .clone()
    }
}

/// A producer group of a checkout that produced no order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub producer_id: ProducerId,
    pub error: OrderError,
}

impl From<GroupRejection> for GroupFailure {
    fn from(rejection: GroupRejection) -> Self {
        Self {
            producer_id: rejection.producer_id,
            error: rejection.error,
        }
    }
}

/// Result of a checkout: one entry per producer group plus skipped lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOutcome {
    /// Committed orders, in the order their producer first appeared in the cart.
    pub orders: Vec<Order>,
    pub failures: Vec<GroupFailure>,

    /// Cart lines whose product no longer exists.
    pub unknown_products: Vec<ProductId>,
}

impl CheckoutOutcome {
    /// True if at least one order was created.
    pub fn created_any(&self) -> bool {
        !self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_for_its_producer() {
        let producer = ProducerId::new();
        let request = CheckoutRequest::new(PickupSelection::new("Market hall", None))
            .with_pickup_override(producer, PickupSelection::new("Farm gate", None));

        assert_eq!(request.pickup_for(producer).pickup_point, "Farm gate");
        assert_eq!(
            request.pickup_for(ProducerId::new()).pickup_point,
            "Market hall"
        );
    }

    #[test]
    fn blank_pickup_point_fails_validation() {
        let request = CheckoutRequest::new(PickupSelection::new("Market hall", None))
            .with_pickup_override(ProducerId::new(), PickupSelection::new("", None));
        assert_eq!(request.validate(), Err(OrderError::PickupPointRequired));
    }

    #[test]
    fn payment_instruction_sets_initial_status() {
        assert_eq!(
            PaymentInstruction::OnPickup.initial_update().status,
            PaymentStatus::Pending
        );
        let confirmed = PaymentInstruction::Confirmed {
            payment_intent_id: "pi_1".to_string(),
            payment_method_id: "pm_1".to_string(),
        };
        assert_eq!(confirmed.initial_update().status, PaymentStatus::Paid);
        let charge = PaymentInstruction::Charge {
            payment_method_id: "pm_1".to_string(),
        };
        assert_eq!(charge.initial_update().status, PaymentStatus::Pending);
    }

    #[test]
    fn payment_instruction_json_shape() {
        let json = serde_json::to_value(PaymentInstruction::Charge {
            payment_method_id: "pm_1".to_string(),
        })
        .unwrap();
        assert_eq!(json["method"], "charge");
        assert_eq!(json["payment_method_id"], "pm_1");
    }
}
