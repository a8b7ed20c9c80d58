//! Checkout route handlers.
//!
//! Opening checkout records an abandoned order for the cart and remembers
//! its id in the session. Submitting the billing form finalizes that same
//! order, so an order id is assigned before payment details are entered.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{LineItem, OrderId, OrderSnapshot, OrderStatus, Reconciliation, reconcile};

use crate::backend::{BackendError, Cart, CartOwner, Order, OrderPayload};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::forms::{CheckoutForm, FormErrors};
use crate::middleware::{Owner, PageContext, set_flash};
use crate::models::{Flash, session_keys};
use crate::state::AppState;

use super::cart::CartView;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub errors: FormErrors,
    pub order_id: Option<OrderId>,
}

/// Lines that belong in an order.
fn order_items(cart: &Cart) -> Vec<LineItem> {
    cart.line_items()
        .into_iter()
        .filter(|item| item.quantity > 0)
        .collect()
}

/// Bring the session's abandoned order in line with the cart.
///
/// Returns `None` when the cart is empty, in which case the remembered order
/// id is dropped.
async fn sync_pending_order(
    state: &AppState,
    session: &Session,
    owner: &CartOwner,
    items: Vec<LineItem>,
) -> Result<Option<Order>> {
    let backend = state.backend();

    let existing = match session.get::<OrderId>(session_keys::PENDING_ORDER).await? {
        Some(id) => match backend.get_order(id).await {
            Ok(order) if order.is_owned_by(owner) => Some(order),
            Ok(_) | Err(BackendError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let decision = reconcile(
        existing.as_ref().map(|order| OrderSnapshot {
            status: order.status,
            items: &order.items,
        }),
        &items,
    );

    let order = match (decision, existing) {
        (Reconciliation::EmptyCart, _) => {
            session
                .remove::<OrderId>(session_keys::PENDING_ORDER)
                .await?;
            return Ok(None);
        }
        (Reconciliation::Unchanged, Some(order)) => order,
        (Reconciliation::Replace, Some(order)) => {
            tracing::debug!(order_id = %order.id, "Cart changed, replacing abandoned order items");
            let payload = OrderPayload::new(owner, items, OrderStatus::Abandoned);
            backend.update_order(order.id, &payload).await?
        }
        (Reconciliation::Create | Reconciliation::Unchanged | Reconciliation::Replace, _) => {
            let payload = OrderPayload::new(owner, items, OrderStatus::Abandoned);
            let order = backend.create_order(&payload).await?;
            tracing::info!(order_id = %order.id, "Created abandoned order");
            session
                .insert(session_keys::PENDING_ORDER, order.id)
                .await?;
            order
        }
    };

    Ok(Some(order))
}

/// Display the checkout page.
///
/// An empty cart redirects back to the cart. If the abandoned order cannot
/// be recorded the page still renders; the order is created on submit.
#[instrument(skip(state, page, session))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    session: Session,
    Owner(owner): Owner,
) -> Result<Response> {
    let cart = state.backend().get_cart(&owner).await?;
    let items = order_items(&cart);
    if items.is_empty() {
        set_flash(&session, Flash::error("Your cart is empty")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let order_id = match sync_pending_order(&state, &session, &owner, items).await {
        Ok(order) => order.map(|o| o.id),
        Err(e) => {
            tracing::warn!("Failed to record abandoned order: {e}");
            None
        }
    };

    let form = page
        .user
        .as_ref()
        .map(|user| CheckoutForm {
            full_name: user.name.clone(),
            email: user.email.to_string(),
            ..CheckoutForm::default()
        })
        .unwrap_or_default();

    Ok(CheckoutTemplate {
        page,
        cart: CartView::from(&cart),
        form,
        errors: FormErrors::default(),
        order_id,
    }
    .into_response())
}

/// Place the order.
///
/// Invalid billing details re-render the form with inline errors. On
/// success the abandoned order moves to its placed status with the billing
/// details attached, the cart is emptied and the customer lands on the
/// order confirmation.
#[instrument(skip(state, page, session, form))]
pub async fn submit(
    State(state): State<AppState>,
    page: PageContext,
    session: Session,
    Owner(owner): Owner,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let backend = state.backend();
    let cart = backend.get_cart(&owner).await?;
    let items = order_items(&cart);
    if items.is_empty() {
        set_flash(&session, Flash::error("Your cart is empty")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let billing = match form.validate(Utc::now().date_naive()) {
        Ok(billing) => billing,
        Err(errors) => {
            let order_id = session
                .get::<OrderId>(session_keys::PENDING_ORDER)
                .await?;
            let template = CheckoutTemplate {
                page,
                cart: CartView::from(&cart),
                form: form.without_card(),
                errors,
                order_id,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response());
        }
    };

    let order = sync_pending_order(&state, &session, &owner, items.clone())
        .await?
        .ok_or_else(|| AppError::Internal("no order for a non-empty cart".to_string()))?;

    let status = billing.payment_method.placed_status();
    let payload = OrderPayload::new(&owner, items, status).with_billing(billing);
    let placed = backend.update_order(order.id, &payload).await?;

    if let Err(e) = backend.clear_cart(&owner).await {
        tracing::warn!(order_id = %placed.id, "Order placed but cart not cleared: {e}");
    }
    session
        .remove::<OrderId>(session_keys::PENDING_ORDER)
        .await?;

    tracing::info!(order_id = %placed.id, status = %status, "Order placed");
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", &placed.id.to_string())]),
    );
    set_flash(
        &session,
        Flash::success(format!("Thank you! Order #{} has been placed.", placed.id)),
    )
    .await;

    Ok(Redirect::to(&format!("/orders/{}", placed.id)).into_response())
}
