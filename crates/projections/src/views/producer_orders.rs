//! Producer view: orders placed with the caller, with customer contact details.

use common::{CustomerId, OrderId};
use domain::{Order, OrderStatus, PaymentStatus};
use serde::Serialize;

use super::{LineView, decimal, line_views};
use crate::directory::Profile;
use crate::format::{format_date, format_timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactView {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// An order as its producer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProducerOrderView {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub contact: ContactView,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub lines: Vec<LineView>,
    pub total_cents: i64,
    pub total: String,
    pub pickup_point: String,
    pub pickup_date: Option<String>,
    pub created_at: String,
}

impl ProducerOrderView {
    /// Builds the view. Without a profile the customer id stands in for the
    /// name and contact details are empty.
    pub fn build(order: &Order, customer: Option<&Profile>) -> Self {
        let (customer_name, contact) = match customer {
            Some(profile) => (
                profile.display_name.clone(),
                ContactView {
                    email: profile.email.clone(),
                    phone: profile.phone.clone(),
                },
            ),
            None => (order.customer_id().to_string(), ContactView::default()),
        };

        Self {
            order_id: order.id(),
            customer_id: order.customer_id(),
            customer_name,
            contact,
            status: order.status(),
            payment_status: order.payment_status(),
            lines: line_views(order.lines()),
            total_cents: order.total().cents(),
            total: decimal(order.total()),
            pickup_point: order.pickup().pickup_point.clone(),
            pickup_date: order.pickup().pickup_date.map(format_date),
            created_at: format_timestamp(order.created_at()),
        }
    }
}
