//! Customer view: the caller's orders with each producer's display name.

use common::{OrderId, ProducerId};
use domain::{Order, OrderStatus, PaymentStatus};
use serde::Serialize;

use super::{LineView, decimal, line_views};
use crate::directory::Profile;
use crate::format::{format_date, format_timestamp};

/// An order as its customer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerOrderView {
    pub order_id: OrderId,
    pub producer_id: ProducerId,
    pub producer_name: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub lines: Vec<LineView>,
    pub total_cents: i64,
    pub total: String,
    pub pickup_point: String,
    pub pickup_date: Option<String>,
    pub created_at: String,
}

impl CustomerOrderView {
    /// Builds the view. Without a profile the producer id stands in for the name.
    pub fn build(order: &Order, producer: Option<&Profile>) -> Self {
        let producer_name = producer
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| order.producer_id().to_string());

        Self {
            order_id: order.id(),
            producer_id: order.producer_id(),
            producer_name,
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
