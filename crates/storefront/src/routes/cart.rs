//! Cart route handlers.
//!
//! Every action is a plain form post that redirects back to a page, with the
//! outcome carried to that page as a flash toast.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{CartItemId, LineItem, OrderTotals, ProductId};

use crate::backend::{BackendError, Cart, CartItem};
use crate::error::add_breadcrumb;
use crate::middleware::{Owner, PageContext, set_flash};
use crate::models::Flash;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Priced line display data, shared by the cart, checkout and order pages.
#[derive(Debug, Clone)]
pub struct LineView {
    pub name: String,
    pub product_href: String,
    pub quantity: u32,
    pub unit_price: String,
    /// Undiscounted unit price when a discount applies.
    pub compare_at_price: Option<String>,
    pub line_total: String,
    pub line_savings: Option<String>,
}

impl From<&LineItem> for LineView {
    fn from(line: &LineItem) -> Self {
        let discounted = line.discount.is_active();
        Self {
            name: line.name.clone(),
            product_href: format!("/products/{}", line.product_id),
            quantity: line.quantity,
            unit_price: line.discounted_price().to_string(),
            compare_at_price: discounted.then(|| line.unit_price.to_string()),
            line_total: line.line_total().to_string(),
            line_savings: discounted.then(|| line.line_savings().to_string()),
        }
    }
}

/// Order totals display data.
#[derive(Debug, Clone)]
pub struct TotalsView {
    pub subtotal: String,
    pub total: String,
    pub total_save: Option<String>,
    pub item_count: u32,
}

impl From<&OrderTotals> for TotalsView {
    fn from(totals: &OrderTotals) -> Self {
        Self {
            subtotal: totals.subtotal.to_string(),
            total: totals.total.to_string(),
            total_save: totals.has_savings().then(|| totals.total_save.to_string()),
            item_count: totals.item_count,
        }
    }
}

/// Cart row display data.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub item_id: CartItemId,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub line: LineView,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            item_id: item.id,
            image_url: item.product.image_url.clone(),
            in_stock: item.product.in_stock(),
            line: LineView::from(&item.product.as_line_item(item.quantity)),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub totals: TotalsView,
}

impl CartView {
    /// Whether there is nothing to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .items
                .iter()
                .filter(|item| item.quantity > 0)
                .map(CartLineView::from)
                .collect(),
            totals: TotalsView::from(&cart.totals()),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: CartItemId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: CartItemId,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
///
/// A backend failure shows an empty cart with an error toast rather than an
/// error page.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    mut page: PageContext,
    Owner(owner): Owner,
) -> impl IntoResponse {
    let cart = match state.backend().get_cart(&owner).await {
        Ok(cart) => CartView::from(&cart),
        Err(e) => {
            tracing::warn!("Failed to fetch cart: {e}");
            page.flash = Some(Flash::error(cart_failure_message(&e)));
            CartView::from(&Cart::default())
        }
    };

    CartShowTemplate { page, cart }
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Owner(owner): Owner,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let quantity = form.quantity.unwrap_or(1).max(1);

    match state
        .backend()
        .add_to_cart(&owner, form.product_id, quantity)
        .await
    {
        Ok(_) => {
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", &form.product_id.to_string())]),
            );
            let message = if quantity == 1 {
                "Added to cart".to_string()
            } else {
                format!("Added {quantity} items to cart")
            };
            set_flash(&session, Flash::success(message)).await;
            Redirect::to("/cart").into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to add product {} to cart: {e}", form.product_id);
            set_flash(&session, Flash::error(cart_failure_message(&e))).await;
            Redirect::to(&format!("/products/{}", form.product_id)).into_response()
        }
    }
}

/// Change the quantity of a cart line. A quantity of zero removes it.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Owner(owner): Owner,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let result = if form.quantity == 0 {
        state.backend().remove_cart_item(&owner, form.item_id).await
    } else {
        state
            .backend()
            .update_cart_item(&owner, form.item_id, form.quantity)
            .await
    };

    match result {
        Ok(_) => set_flash(&session, Flash::success("Cart updated")).await,
        Err(e) => {
            tracing::warn!("Failed to update cart item {}: {e}", form.item_id);
            set_flash(&session, Flash::error(cart_failure_message(&e))).await;
        }
    }

    Redirect::to("/cart").into_response()
}

/// Remove a cart line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Owner(owner): Owner,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    match state.backend().remove_cart_item(&owner, form.item_id).await {
        Ok(_) => set_flash(&session, Flash::success("Item removed")).await,
        Err(e) => {
            tracing::warn!("Failed to remove cart item {}: {e}", form.item_id);
            set_flash(&session, Flash::error(cart_failure_message(&e))).await;
        }
    }

    Redirect::to("/cart").into_response()
}

/// Toast text for a failed cart call.
fn cart_failure_message(error: &BackendError) -> String {
    error
        .user_message()
        .map_or_else(|| "Could not update your cart, please try again".to_string(), String::from)
}
