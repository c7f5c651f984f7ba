//! Login-time merge of an anonymous cart into the customer's server cart.

use common::ProductId;

use super::{Cart, CartLine};
use crate::product::Catalog;

/// What happened to the local lines during a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of local lines folded into the server cart.
    pub merged: usize,

    /// Local lines that were skipped: unknown or archived product, zero
    /// quantity, or a sum that would overflow.
    pub dropped: Vec<ProductId>,
}

/// Merges `local` into `server`.
///
/// The merge is a union keyed by product; when both sides hold the same product
/// the quantities are summed. A bad local line is dropped and the merge carries
/// on with the rest.
pub fn reconcile(server: &mut Cart, local: &[CartLine], catalog: &Catalog) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for line in local {
        if line.quantity == 0 || catalog.available(&line.product_id).is_none() {
            report.dropped.push(line.product_id);
            continue;
        }

        match server.add_line(line.product_id, line.quantity) {
            Ok(()) => report.merged += 1,
            Err(_) => report.dropped.push(line.product_id),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use common::{Money, ProducerId};

    use super::*;
    use crate::product::Product;

    fn product(available: bool) -> Product {
        Product {
            id: ProductId::new(),
            producer_id: ProducerId::new(),
            name: "Honey".to_string(),
            price: Money::from_cents(800),
            stock: 20,
            unit: "jar".to_string(),
            category: "pantry".to_string(),
            available,
        }
    }

    fn line(product_id: ProductId, quantity: u32) -> CartLine {
        CartLine {
            product_id,
            quantity,
        }
    }

    #[test]
    fn quantities_are_summed_not_overwritten() {
        let p1 = product(true);
        let catalog: Catalog = [p1.clone()].into_iter().collect();

        let mut server = Cart::new();
        server.add_line(p1.id, 3).unwrap();

        let report = reconcile(&mut server, &[line(p1.id, 2)], &catalog);

        assert_eq!(server.quantity_of(&p1.id), Some(5));
        assert_eq!(report.merged, 1);
        assert!(report.dropped.is_empty());
    }

    #[test]
    fn union_keeps_lines_from_both_sides() {
        let p1 = product(true);
        let p2 = product(true);
        let catalog: Catalog = [p1.clone(), p2.clone()].into_iter().collect();

        let mut server = Cart::new();
        server.add_line(p1.id, 1).unwrap();

        reconcile(&mut server, &[line(p2.id, 4)], &catalog);

        assert_eq!(server.len(), 2);
        assert_eq!(server.quantity_of(&p1.id), Some(1));
        assert_eq!(server.quantity_of(&p2.id), Some(4));
    }

    #[test]
    fn unknown_and_archived_products_are_dropped() {
        let kept = product(true);
        let archived = product(false);
        let catalog: Catalog = [kept.clone(), archived.clone()].into_iter().collect();
        let missing = ProductId::new();

        let mut server = Cart::new();
        let report = reconcile(
            &mut server,
            &[line(missing, 1), line(archived.id, 2), line(kept.id, 3)],
            &catalog,
        );

        assert_eq!(server.len(), 1);
        assert_eq!(server.quantity_of(&kept.id), Some(3));
        assert_eq!(report.merged, 1);
        assert_eq!(report.dropped, vec![missing, archived.id]);
    }

    #[test]
    fn zero_quantity_and_overflow_are_dropped() {
        let p1 = product(true);
        let p2 = product(true);
        let catalog: Catalog = [p1.clone(), p2.clone()].into_iter().collect();

        let mut server = Cart::new();
        server.add_line(p2.id, u32::MAX).unwrap();

        let report = reconcile(&mut server, &[line(p1.id, 0), line(p2.id, 1)], &catalog);

        assert_eq!(report.dropped, vec![p1.id, p2.id]);
        assert_eq!(server.quantity_of(&p2.id), Some(u32::MAX));
        assert!(server.quantity_of(&p1.id).is_none());
    }

    #[test]
    fn duplicate_local_lines_accumulate() {
        let p1 = product(true);
        let catalog: Catalog = [p1.clone()].into_iter().collect();

        let mut server = Cart::new();
        reconcile(&mut server, &[line(p1.id, 1), line(p1.id, 2)], &catalog);

        assert_eq!(server.len(), 1);
        assert_eq!(server.quantity_of(&p1.id), Some(3));
    }
}
