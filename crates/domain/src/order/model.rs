//! The order record.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, Money, OrderId, ProducerId, ProductId};
use serde::{Deserialize, Serialize};

use super::{OrderDraft, OrderError, OrderStatus, PaymentStatus};
use crate::actor::Actor;

/// A line of a committed order. The unit price is frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns `quantity * unit_price`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Where and when the customer collects an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupSelection {
    pub pickup_point: String,
    pub pickup_date: Option<NaiveDate>,
}

impl PickupSelection {
    pub fn new(pickup_point: impl Into<String>, pickup_date: Option<NaiveDate>) -> Self {
        Self {
            pickup_point: pickup_point.into(),
            pickup_date,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        if self.pickup_point.trim().is_empty() {
            return Err(OrderError::PickupPointRequired);
        }
        Ok(())
    }
}

/// Change to the payment fields of an order. `None` ids leave the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub payment_method_id: Option<String>,
}

impl PaymentUpdate {
    pub fn pending() -> Self {
        Self::default()
    }
}

/// All fields of a persisted order, used to rebuild an [`Order`] from storage.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub producer_id: ProducerId,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub pickup: PickupSelection,
    pub payment_method_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single-producer order.
///
/// Everything except the status and payment fields is fixed at creation. The
/// total is computed once from the lines and never recomputed from live prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    producer_id: ProducerId,
    lines: Vec<OrderLine>,
    total: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    pickup: PickupSelection,
    payment_method_id: Option<String>,
    payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a `PENDING` order from one producer group of a checkout.
    pub fn place(
        id: OrderId,
        customer_id: CustomerId,
        draft: OrderDraft,
        pickup: PickupSelection,
        payment: PaymentUpdate,
        placed_at: DateTime<Utc>,
    ) -> Self {
        let producer_id = draft.producer_id();
        let total = draft.total();
        Self {
            id,
            customer_id,
            producer_id,
            lines: draft.into_lines(),
            total,
            status: OrderStatus::Pending,
            payment_status: payment.status,
            pickup,
            payment_method_id: payment.payment_method_id,
            payment_intent_id: payment.payment_intent_id,
            created_at: placed_at,
            updated_at: placed_at,
        }
    }

    /// Rebuilds a persisted order, re-checking the total invariant.
    pub fn restore(parts: OrderParts) -> Result<Self, OrderError> {
        let computed = Self::compute_total(&parts.lines).ok_or(OrderError::AmountOverflow {
            producer_id: parts.producer_id,
        })?;
        if computed != parts.total {
            return Err(OrderError::TotalMismatch {
                order_id: parts.id,
                stored: parts.total,
                computed,
            });
        }

        Ok(Self {
            id: parts.id,
            customer_id: parts.customer_id,
            producer_id: parts.producer_id,
            lines: parts.lines,
            total: parts.total,
            status: parts.status,
            payment_status: parts.payment_status,
            pickup: parts.pickup,
            payment_method_id: parts.payment_method_id,
            payment_intent_id: parts.payment_intent_id,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    /// Sums `quantity * unit_price` over the lines, or `None` on overflow.
    pub fn compute_total(lines: &[OrderLine]) -> Option<Money> {
        lines
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total()?))
    }

    /// Records a status change that storage has already accepted.
    pub fn apply_transition(&mut self, to: OrderStatus, at: DateTime<Utc>) {
        self.status = to;
        self.updated_at = at;
    }

    /// Records a payment change that storage has already accepted.
    pub fn apply_payment(&mut self, update: &PaymentUpdate, at: DateTime<Utc>) {
        self.payment_status = update.status;
        if let Some(intent) = &update.payment_intent_id {
            self.payment_intent_id = Some(intent.clone());
        }
        if let Some(method) = &update.payment_method_id {
            self.payment_method_id = Some(method.clone());
        }
        self.updated_at = at;
    }

    /// Returns true if the actor is this order's customer or producer.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        match actor {
            Actor::Customer(id) => *id == self.customer_id,
            Actor::Producer(id) => *id == self.producer_id,
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn producer_id(&self) -> ProducerId {
        self.producer_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn pickup(&self) -> &PickupSelection {
        &self.pickup
    }

    pub fn payment_method_id(&self) -> Option<&str> {
        self.payment_method_id.as_deref()
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
