//! Partitioning a multi-producer cart into single-producer order drafts.

use common::{Money, ProducerId, ProductId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderLine};
use crate::cart::CartLine;
use crate::product::{Catalog, Product};

/// The lines of one producer group, priced and totalled, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    producer_id: ProducerId,
    lines: Vec<OrderLine>,
    total: Money,
}

impl OrderDraft {
    /// Builds a draft and computes its total.
    pub fn new(producer_id: ProducerId, lines: Vec<OrderLine>) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let total = super::Order::compute_total(&lines)
            .ok_or(OrderError::AmountOverflow { producer_id })?;
        Ok(Self {
            producer_id,
            lines,
            total,
        })
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

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|line| line.product_id).collect()
    }

    pub fn into_lines(self) -> Vec<OrderLine> {
        self.lines
    }
}

/// A producer group that cannot become an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRejection {
    pub producer_id: ProducerId,
    pub error: OrderError,
}

/// Result of partitioning a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// One draft per producer whose whole group passed validation.
    pub drafts: Vec<OrderDraft>,

    /// Producer groups rejected as a whole.
    pub rejected: Vec<GroupRejection>,

    /// Lines whose product no longer exists, so no producer can be derived.
    pub unknown_products: Vec<ProductId>,
}

impl Partition {
    /// Number of distinct producers represented in the cart.
    pub fn group_count(&self) -> usize {
        self.drafts.len() + self.rejected.len()
    }
}

/// Groups cart lines by the producer that owns each line's product.
///
/// The producer is always read from the product itself. Groups keep the order
/// in which their producer first appears in the cart. A group with any line that
/// exceeds the product's orderable stock is rejected in full; other groups are
/// unaffected. Fails with [`OrderError::EmptyCart`] when no group can be formed.
pub fn partition(lines: &[CartLine], catalog: &Catalog) -> Result<Partition, OrderError> {
    let mut groups: Vec<(ProducerId, Vec<(&CartLine, &Product)>)> = Vec::new();
    let mut result = Partition::default();

    for line in lines {
        let Some(product) = catalog.get(&line.product_id) else {
            result.unknown_products.push(line.product_id);
            continue;
        };

        match groups
            .iter_mut()
            .find(|(producer_id, _)| *producer_id == product.producer_id)
        {
            Some((_, members)) => members.push((line, product)),
            None => groups.push((product.producer_id, vec![(line, product)])),
        }
    }

    if groups.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    for (producer_id, members) in groups {
        match build_draft(producer_id, &members) {
            Ok(draft) => result.drafts.push(draft),
            Err(error) => result.rejected.push(GroupRejection { producer_id, error }),
        }
    }

    Ok(result)
}

fn build_draft(
    producer_id: ProducerId,
    members: &[(&CartLine, &Product)],
) -> Result<OrderDraft, OrderError> {
    let mut lines = Vec::with_capacity(members.len());

    for (line, product) in members {
        let available = product.orderable_stock();
        if line.quantity > available {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                requested: line.quantity,
                available,
            });
        }

        lines.push(OrderLine {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    OrderDraft::new(producer_id, lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;

    fn product(producer_id: ProducerId, cents: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(),
            producer_id,
            name: "Leeks".to_string(),
            price: Money::from_cents(cents),
            stock,
            unit: "bunch".to_string(),
            category: "vegetables".to_string(),
            available: true,
        }
    }

    #[test]
    fn two_producers_make_two_drafts_with_exact_totals() {
        let x = ProducerId::new();
        let y = ProducerId::new();
        let a = product(x, 350, 10);
        let b = product(y, 500, 10);
        let catalog: Catalog = [a.clone(), b.clone()].into_iter().collect();

        let mut cart = Cart::new();
        cart.add_line(a.id, 2).unwrap();
        cart.add_line(b.id, 1).unwrap();

        let partition = partition(cart.lines(), &catalog).unwrap();

        assert_eq!(partition.drafts.len(), 2);
        assert!(partition.rejected.is_empty());
        assert_eq!(partition.drafts[0].producer_id(), x);
        assert_eq!(partition.drafts[0].total(), Money::from_cents(700));
        assert_eq!(partition.drafts[1].producer_id(), y);
        assert_eq!(partition.drafts[1].total(), Money::from_cents(500));
    }

    #[test]
    fn producer_is_derived_from_each_product_not_the_first_line() {
        let x = ProducerId::new();
        let y = ProducerId::new();
        let products = [
            product(x, 100, 5),
            product(y, 200, 5),
            product(x, 300, 5),
            product(y, 400, 5),
        ];
        let catalog: Catalog = products.iter().cloned().collect();
        let mut cart = Cart::new();
        for p in &products {
            cart.add_line(p.id, 1).unwrap();
        }

        let partition = partition(cart.lines(), &catalog).unwrap();

        assert_eq!(partition.group_count(), 2);
        for draft in &partition.drafts {
            for line in draft.lines() {
                let owner = catalog.get(&line.product_id).unwrap().producer_id;
                assert_eq!(owner, draft.producer_id());
            }
        }
        assert_eq!(partition.drafts[0].total(), Money::from_cents(400));
        assert_eq!(partition.drafts[1].total(), Money::from_cents(600));
    }

    #[test]
    fn empty_cart_fails() {
        let result = partition(&[], &Catalog::new());
        assert_eq!(result, Err(OrderError::EmptyCart));
    }

    #[test]
    fn cart_of_only_unknown_products_fails_as_empty() {
        let lines = [CartLine::new(ProductId::new(), 1).unwrap()];
        assert_eq!(
            partition(&lines, &Catalog::new()),
            Err(OrderError::EmptyCart)
        );
    }

    #[test]
    fn unknown_products_are_reported_and_skipped() {
        let x = ProducerId::new();
        let a = product(x, 100, 5);
        let catalog: Catalog = [a.clone()].into_iter().collect();
        let missing = ProductId::new();
        let lines = [
            CartLine::new(missing, 1).unwrap(),
            CartLine::new(a.id, 2).unwrap(),
        ];

        let partition = partition(&lines, &catalog).unwrap();

        assert_eq!(partition.unknown_products, vec![missing]);
        assert_eq!(partition.drafts.len(), 1);
    }

    #[test]
    fn insufficient_stock_rejects_only_that_producer_group() {
        let x = ProducerId::new();
        let y = ProducerId::new();
        let a1 = product(x, 100, 10);
        let a2 = product(x, 100, 1);
        let b = product(y, 500, 3);
        let catalog: Catalog = [a1.clone(), a2.clone(), b.clone()].into_iter().collect();

        let mut cart = Cart::new();
        cart.add_line(a1.id, 2).unwrap();
        cart.add_line(a2.id, 2).unwrap();
        cart.add_line(b.id, 3).unwrap();

        let partition = partition(cart.lines(), &catalog).unwrap();

        assert_eq!(partition.drafts.len(), 1);
        assert_eq!(partition.drafts[0].producer_id(), y);
        assert_eq!(
            partition.rejected,
            vec![GroupRejection {
                producer_id: x,
                error: OrderError::InsufficientStock {
                    product_id: a2.id,
                    requested: 2,
                    available: 1,
                },
            }]
        );
    }

    #[test]
    fn archived_product_counts_as_out_of_stock() {
        let x = ProducerId::new();
        let mut a = product(x, 100, 10);
        a.available = false;
        let catalog: Catalog = [a.clone()].into_iter().collect();
        let lines = [CartLine::new(a.id, 1).unwrap()];

        let partition = partition(&lines, &catalog).unwrap();
        assert!(matches!(
            partition.rejected[0].error,
            OrderError::InsufficientStock { available: 0, .. }
        ));
    }

    #[test]
    fn overflowing_total_rejects_group() {
        let x = ProducerId::new();
        let a = product(x, i64::MAX / 2, u32::MAX);
        let catalog: Catalog = [a.clone()].into_iter().collect();
        let lines = [CartLine::new(a.id, 3).unwrap()];

        let partition = partition(&lines, &catalog).unwrap();
        assert_eq!(
            partition.rejected[0].error,
            OrderError::AmountOverflow { producer_id: x }
        );
    }

    #[test]
    fn draft_snapshot_keeps_price_at_order_time() {
        let x = ProducerId::new();
        let mut a = product(x, 250, 10);
        let catalog: Catalog = [a.clone()].into_iter().collect();
        let lines = [CartLine::new(a.id, 4).unwrap()];

        let draft = partition(&lines, &catalog).unwrap().drafts.remove(0);
        a.price = Money::from_cents(999);

        assert_eq!(draft.lines()[0].unit_price, Money::from_cents(250));
        assert_eq!(draft.total(), Money::from_cents(1000));
    }
}
