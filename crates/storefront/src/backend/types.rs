//! Transfer types for the REST backend.
//!
//! These mirror the backend's JSON (camelCase) and are displayed or posted
//! back more or less verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    CartId, CartItemId, CategoryId, Discount, Email, GuestToken, LineItem, OrderId, OrderStatus,
    OrderTotals, PaymentMethod, Price, ProductId, SubCategoryId, UserId, UserRole,
};

// =============================================================================
// Accounts
// =============================================================================

/// A backend user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `POST /user/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body for `POST /user/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

// =============================================================================
// Catalogue
// =============================================================================

/// Top-level product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Category subdivision that products belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub category_id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sub_category_id: SubCategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: u32,
}

impl Product {
    /// Price after the product's discount.
    #[must_use]
    pub fn discounted_price(&self) -> Price {
        self.as_line_item(1).discounted_price()
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Price this product as a line of `quantity` units.
    #[must_use]
    pub fn as_line_item(&self, quantity: u32) -> LineItem {
        LineItem {
            product_id: self.id,
            name: self.name.clone(),
            unit_price: self.price,
            discount: self.discount,
            quantity,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Who a cart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartOwner {
    /// A logged-in account.
    User(UserId),
    /// An anonymous visitor's session.
    Guest(GuestToken),
}

impl CartOwner {
    /// Query parameter identifying the owner.
    #[must_use]
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            Self::User(id) => ("userId", id.to_string()),
            Self::Guest(token) => ("guestToken", token.to_string()),
        }
    }

    /// The user id, if the owner is logged in.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    /// The guest token, if the owner is anonymous.
    #[must_use]
    pub const fn guest_token(&self) -> Option<GuestToken> {
        match self {
            Self::User(_) => None,
            Self::Guest(token) => Some(*token),
        }
    }
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: u32,
}

/// A shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub id: Option<CartId>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Cart lines priced for totals and order payloads.
    #[must_use]
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items
            .iter()
            .map(|item| item.product.as_line_item(item.quantity))
            .collect()
    }

    /// Totals over the cart's lines.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::compute(&self.line_items())
    }

    /// Whether the cart has no units in it.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|item| item.quantity == 0)
    }
}

/// Body for `POST /cart/items`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_token: Option<GuestToken>,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body for `PUT /cart/items/{id}`.
#[derive(Debug, Serialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

// =============================================================================
// Orders
// =============================================================================

/// Billing and payment details attached when checkout is submitted.
///
/// Only the last four card digits are ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub card_last4: Option<String>,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub guest_token: Option<GuestToken>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total: Price,
    #[serde(default)]
    pub total_save: Price,
    #[serde(default)]
    pub billing: Option<BillingDetails>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether `owner` may see this order.
    #[must_use]
    pub fn is_owned_by(&self, owner: &CartOwner) -> bool {
        match owner {
            CartOwner::User(id) => self.user_id == Some(*id),
            CartOwner::Guest(token) => self.user_id.is_none() && self.guest_token == Some(*token),
        }
    }
}

/// Body for `POST /order` and `PUT /order/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_token: Option<GuestToken>,
    pub items: Vec<LineItem>,
    pub status: OrderStatus,
    pub total: Price,
    pub total_save: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<BillingDetails>,
}

impl OrderPayload {
    /// Build a payload for `items`, computing totals rounded to cents.
    #[must_use]
    pub fn new(owner: &CartOwner, items: Vec<LineItem>, status: OrderStatus) -> Self {
        let totals = OrderTotals::compute(&items);
        Self {
            user_id: owner.user_id(),
            guest_token: owner.guest_token(),
            items,
            status,
            total: Price::new(totals.total.rounded()),
            total_save: Price::new(totals.total_save.rounded()),
            billing: None,
        }
    }

    /// Attach billing details.
    #[must_use]
    pub fn with_billing(mut self, billing: BillingDetails) -> Self {
        self.billing = Some(billing);
        self
    }
}

/// Error body returned by the backend on failure.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "error")]
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_json(id: i64, price: &str, discount: u32) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "subCategoryId": 1,
            "name": format!("Product {id}"),
            "price": price,
            "discount": discount,
            "stock": 5
        })
    }

    #[test]
    fn test_cart_totals_from_backend_json() {
        let json = serde_json::json!({
            "id": 3,
            "items": [
                { "id": 1, "product": product_json(10, "100.00", 10), "quantity": 2 },
                { "id": 2, "product": product_json(11, "19.99", 0), "quantity": 3 }
            ]
        });
        let cart: Cart = serde_json::from_value(json).unwrap();
        let totals = cart.totals();

        assert_eq!(totals.total, Price::from_cents(23997));
        assert_eq!(totals.total_save, Price::from_cents(2000));
        assert_eq!(totals.item_count, 5);
        assert!(!cart.is_empty());
    }

    #[test]
    fn test_order_payload_rounds_totals() {
        let product: Product = serde_json::from_value(product_json(1, "19.99", 15)).unwrap();
        let owner = CartOwner::User(UserId::new(9));
        let payload = OrderPayload::new(
            &owner,
            vec![product.as_line_item(1)],
            OrderStatus::Abandoned,
        );

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["userId"], 9);
        assert!(json.get("guestToken").is_none());
        assert_eq!(json["total"], "16.99");
        assert_eq!(json["totalSave"], "3.00");
        assert_eq!(json["status"], "abandoned");
        assert_eq!(json["items"][0]["productId"], 1);
    }

    #[test]
    fn test_order_ownership() {
        let token = GuestToken::generate();
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 1,
            "guestToken": token,
            "status": "pending"
        }))
        .unwrap();

        assert!(order.is_owned_by(&CartOwner::Guest(token)));
        assert!(!order.is_owned_by(&CartOwner::Guest(GuestToken::generate())));
        assert!(!order.is_owned_by(&CartOwner::User(UserId::new(1))));
    }

    #[test]
    fn test_owner_query_pair() {
        assert_eq!(
            CartOwner::User(UserId::new(4)).query_pair(),
            ("userId", "4".to_string())
        );
    }
}
