//! Order history and confirmation route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use bazaar_core::{OrderId, OrderTotals};

use crate::backend::{BillingDetails, Order};
use crate::error::{AppError, Result};
use crate::middleware::{Owner, PageContext, RequireAuth};
use crate::state::AppState;

use super::cart::{LineView, TotalsView};

/// Order history row.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: OrderId,
    pub href: String,
    pub placed_on: String,
    pub status: String,
    pub item_count: u32,
    pub total: String,
}

impl From<&Order> for OrderRowView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            href: format!("/orders/{}", order.id),
            placed_on: format_date(order),
            status: order.status.label().to_string(),
            item_count: OrderTotals::compute(&order.items).item_count,
            total: order.total.to_string(),
        }
    }
}

/// Billing summary shown on the order page.
#[derive(Debug, Clone)]
pub struct BillingView {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address_lines: Vec<String>,
    pub payment: String,
}

impl From<&BillingDetails> for BillingView {
    fn from(billing: &BillingDetails) -> Self {
        let payment = match &billing.card_last4 {
            Some(last4) => format!("{} ending in {last4}", billing.payment_method.label()),
            None => billing.payment_method.label().to_string(),
        };
        Self {
            full_name: billing.full_name.clone(),
            email: billing.email.clone(),
            phone: billing.phone.clone(),
            address_lines: vec![
                billing.address.clone(),
                format!("{} {}", billing.postal_code, billing.city),
                billing.country.clone(),
            ],
            payment,
        }
    }
}

/// Order detail display data.
#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub id: OrderId,
    pub placed_on: String,
    pub status: String,
    pub placed: bool,
    pub lines: Vec<LineView>,
    pub totals: TotalsView,
    pub billing: Option<BillingView>,
}

impl From<&Order> for OrderDetailView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            placed_on: format_date(order),
            status: order.status.label().to_string(),
            placed: order.status.is_placed(),
            lines: order.items.iter().map(LineView::from).collect(),
            totals: TotalsView::from(&OrderTotals::compute(&order.items)),
            billing: order.billing.as_ref().map(BillingView::from),
        }
    }
}

fn format_date(order: &Order) -> String {
    order
        .created_at
        .map(|at| at.format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderRowView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderTemplate {
    pub page: PageContext,
    pub order: OrderDetailView,
}

/// Display the logged-in customer's placed orders, newest first.
///
/// Abandoned checkouts are not listed.
#[instrument(skip(state, page, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<OrdersTemplate> {
    let mut orders = state.backend().list_orders(user.id).await?;
    orders.retain(|order| order.status.is_placed());
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    Ok(OrdersTemplate {
        page,
        orders: orders.iter().map(OrderRowView::from).collect(),
    })
}

/// Display one order.
///
/// Only the owner (by user id, or by guest token for guest checkouts) may
/// see it; anyone else gets a 404 so order ids cannot be probed.
#[instrument(skip(state, page, owner))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Owner(owner): Owner,
    Path(id): Path<OrderId>,
) -> Result<OrderTemplate> {
    let order = state.backend().get_order(id).await?;
    if !order.is_owned_by(&owner) {
        return Err(AppError::NotFound(format!("order {id}")));
    }

    Ok(OrderTemplate {
        page,
        order: OrderDetailView::from(&order),
    })
}
