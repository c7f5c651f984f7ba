//! Events emitted after an order is created or changes status.

use chrono::{DateTime, Utc};
use common::{CustomerId, ProducerId};
use serde::{Deserialize, Serialize};

use super::{Order, OrderStatus};

/// Trait for events handed to the notification collaborator.
pub trait DomainEvent {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;
}

/// Party an event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Recipient {
    Customer(CustomerId),
    Producer(ProducerId),
}

/// Events for the order lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// A producer group was committed as an order.
    OrderCreated(OrderCreatedData),

    /// An order moved to a new status.
    OrderStatusChanged(OrderStatusChangedData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub order: Order,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn created(order: Order) -> Self {
        OrderEvent::OrderCreated(OrderCreatedData { order })
    }

    pub fn status_changed(order: Order, from: OrderStatus) -> Self {
        let to = order.status();
        let changed_at = order.updated_at();
        OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            order,
            from,
            to,
            changed_at,
        })
    }

    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::OrderCreated(data) => &data.order,
            OrderEvent::OrderStatusChanged(data) => &data.order,
        }
    }

    /// Parties to notify: both sides of a new order, the customer of a status change.
    pub fn recipients(&self) -> Vec<Recipient> {
        let order = self.order();
        match self {
            OrderEvent::OrderCreated(_) => vec![
                Recipient::Customer(order.customer_id()),
                Recipient::Producer(order.producer_id()),
            ],
            OrderEvent::OrderStatusChanged(_) => vec![Recipient::Customer(order.customer_id())],
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
        }
    }
}
