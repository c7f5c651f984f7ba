//! Order views returned by the query layer.

pub mod customer_orders;
pub mod producer_orders;

use common::{Money, ProductId};
use domain::OrderLine;
use serde::Serialize;

pub use customer_orders::CustomerOrderView;
pub use producer_orders::{ContactView, ProducerOrderView};

/// One order line with prices in cents and as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub unit_price: String,
    pub line_total_cents: i64,
    pub line_total: String,
}

impl From<&OrderLine> for LineView {
    fn from(line: &OrderLine) -> Self {
        // Persisted orders are restored with a checked total, so this cannot overflow.
        let line_total = line.line_total().unwrap_or_default();
        Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            unit_price: line.unit_price.to_string(),
            line_total_cents: line_total.cents(),
            line_total: line_total.to_string(),
        }
    }
}

pub(crate) fn line_views(lines: &[OrderLine]) -> Vec<LineView> {
    lines.iter().map(LineView::from).collect()
}

pub(crate) fn decimal(amount: Money) -> String {
    amount.to_string()
}
