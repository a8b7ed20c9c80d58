//! Order total computation.
//!
//! The checkout page, the billing summary and the order payload all read
//! their numbers from [`OrderTotals::compute`], so what the customer sees is
//! what gets posted to the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Discount, Price, ProductId};

/// One priced line of a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Price,
    #[serde(default)]
    pub discount: Discount,
    pub quantity: u32,
}

impl LineItem {
    /// Unit price after the percentage discount.
    ///
    /// `price * (1 - discount / 100)` when a discount applies, otherwise the
    /// unit price unchanged.
    #[must_use]
    pub fn discounted_price(&self) -> Price {
        if !self.discount.is_active() {
            return self.unit_price;
        }
        let factor = Decimal::ONE - self.discount.value() / Decimal::ONE_HUNDRED;
        Price::new(self.unit_price.amount() * factor)
    }

    /// Discounted unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.discounted_price() * self.quantity
    }

    /// How much the discount saves on this line.
    #[must_use]
    pub fn line_savings(&self) -> Price {
        (self.unit_price - self.discounted_price()) * self.quantity
    }
}

/// Totals for a list of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Sum of undiscounted line prices.
    pub subtotal: Price,
    /// Sum of discounted line totals.
    pub total: Price,
    /// Sum of per-line savings.
    pub total_save: Price,
    /// Number of units across all lines.
    pub item_count: u32,
}

impl OrderTotals {
    /// Compute totals over `items`.
    #[must_use]
    pub fn compute<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a LineItem>,
    {
        items.into_iter().fold(Self::default(), |acc, item| Self {
            subtotal: acc.subtotal + item.unit_price * item.quantity,
            total: acc.total + item.line_total(),
            total_save: acc.total_save + item.line_savings(),
            item_count: acc.item_count.saturating_add(item.quantity),
        })
    }

    /// Whether any line carried a discount.
    #[must_use]
    pub fn has_savings(&self) -> bool {
        self.total_save > Price::ZERO
    }
}
