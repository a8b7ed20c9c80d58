//! Cart-to-order reconciliation.
//!
//! Opening checkout creates an abandoned order from the cart. When the
//! customer comes back to checkout later, the remembered order is compared
//! with the cart to decide whether it can be reused as-is.

use std::collections::BTreeMap;

use crate::pricing::LineItem;
use crate::types::{Discount, OrderStatus, Price, ProductId};

/// What to do with the remembered abandoned order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The cart is empty; no order should exist for it.
    EmptyCart,
    /// No reusable order; create a fresh abandoned one.
    Create,
    /// The order already matches the cart.
    Unchanged,
    /// The order is still abandoned but its items differ from the cart.
    Replace,
}

/// The parts of a stored order that matter for reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct OrderSnapshot<'a> {
    pub status: OrderStatus,
    pub items: &'a [LineItem],
}

/// Decide how an existing order relates to the current cart.
///
/// Lines are compared by product, ignoring order. Duplicate lines for the
/// same product are summed first. A product counts as unchanged only when
/// its quantity, unit price and discount all match.
#[must_use]
pub fn reconcile(existing: Option<OrderSnapshot<'_>>, cart: &[LineItem]) -> Reconciliation {
    if cart.iter().all(|item| item.quantity == 0) {
        return Reconciliation::EmptyCart;
    }

    let Some(order) = existing else {
        return Reconciliation::Create;
    };

    if order.status != OrderStatus::Abandoned {
        return Reconciliation::Create;
    }

    if summarize(order.items) == summarize(cart) {
        Reconciliation::Unchanged
    } else {
        Reconciliation::Replace
    }
}

type LineKey = (u32, Price, Discount);

fn summarize(items: &[LineItem]) -> BTreeMap<ProductId, LineKey> {
    let mut lines = BTreeMap::new();
    for item in items.iter().filter(|item| item.quantity > 0) {
        lines
            .entry(item.product_id)
            .and_modify(|(quantity, _, _): &mut LineKey| {
                *quantity = quantity.saturating_add(item.quantity);
            })
            .or_insert((item.quantity, item.unit_price, item.discount));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, cents: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: String::new(),
            unit_price: Price::from_cents(cents),
            discount: Discount::NONE,
            quantity,
        }
    }

    fn abandoned(items: &[LineItem]) -> Option<OrderSnapshot<'_>> {
        Some(OrderSnapshot {
            status: OrderStatus::Abandoned,
            items,
        })
    }

    #[test]
    fn test_empty_cart_never_creates_order() {
        assert_eq!(reconcile(None, &[]), Reconciliation::EmptyCart);
        let order = vec![item(1, 500, 1)];
        assert_eq!(
            reconcile(abandoned(&order), &[item(1, 500, 0)]),
            Reconciliation::EmptyCart
        );
    }

    #[test]
    fn test_missing_order_is_created() {
        assert_eq!(reconcile(None, &[item(1, 500, 1)]), Reconciliation::Create);
    }

    #[test]
    fn test_placed_order_is_not_reused() {
        let items = vec![item(1, 500, 1)];
        let snapshot = OrderSnapshot {
            status: OrderStatus::Completed,
            items: &items,
        };
        assert_eq!(reconcile(Some(snapshot), &items), Reconciliation::Create);
    }

    #[test]
    fn test_same_items_in_different_order_are_unchanged() {
        let order = vec![item(1, 500, 1), item(2, 250, 3)];
        let cart = vec![item(2, 250, 3), item(1, 500, 1)];
        assert_eq!(reconcile(abandoned(&order), &cart), Reconciliation::Unchanged);
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let order = vec![item(1, 500, 3)];
        let cart = vec![item(1, 500, 1), item(1, 500, 2)];
        assert_eq!(reconcile(abandoned(&order), &cart), Reconciliation::Unchanged);
    }

    #[test]
    fn test_quantity_or_price_change_replaces() {
        let order = vec![item(1, 500, 1)];
        assert_eq!(
            reconcile(abandoned(&order), &[item(1, 500, 2)]),
            Reconciliation::Replace
        );
        assert_eq!(
            reconcile(abandoned(&order), &[item(1, 450, 1)]),
            Reconciliation::Replace
        );
        assert_eq!(
            reconcile(abandoned(&order), &[item(1, 500, 1), item(2, 100, 1)]),
            Reconciliation::Replace
        );
    }
}
