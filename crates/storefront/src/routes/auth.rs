//! Authentication route handlers.
//!
//! Credentials are checked by the REST backend. On success the customer is
//! stored in the session, and anything they put in the cart as a guest is
//! moved onto their account.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{GuestToken, OrderId};

use crate::backend::{BackendError, CartOwner, User};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::forms::{FormErrors, LoginForm, RegisterForm};
use crate::middleware::{PageContext, auth::safe_next, clear_current_user, set_current_user, set_flash};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Where to go after logging in.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub form: LoginForm,
    pub errors: FormErrors,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: RegisterForm,
    pub errors: FormErrors,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Move a guest cart's lines onto the user's cart, then empty it.
///
/// Best effort: a failure leaves the guest cart behind but never blocks the
/// login.
async fn merge_guest_cart(state: &AppState, guest: GuestToken, user: &User) {
    let backend = state.backend();
    let guest_owner = CartOwner::Guest(guest);
    let user_owner = CartOwner::User(user.id);

    let cart = match backend.get_cart(&guest_owner).await {
        Ok(cart) if !cart.is_empty() => cart,
        Ok(_) => return,
        Err(e) => {
            tracing::warn!("Failed to load guest cart for merge: {e}");
            return;
        }
    };

    for item in cart.items.iter().filter(|item| item.quantity > 0) {
        if let Err(e) = backend
            .add_to_cart(&user_owner, item.product.id, item.quantity)
            .await
        {
            tracing::warn!(product_id = %item.product.id, "Failed to merge cart line: {e}");
            return;
        }
    }

    if let Err(e) = backend.clear_cart(&guest_owner).await {
        tracing::warn!("Failed to clear merged guest cart: {e}");
    }
    tracing::debug!(user_id = %user.id, lines = cart.items.len(), "Merged guest cart");
}

/// Log `user` in on this session.
async fn log_in(state: &AppState, session: &Session, user: &User) -> Result<()> {
    if let Some(guest) = session.remove::<GuestToken>(session_keys::GUEST_TOKEN).await? {
        merge_guest_cart(state, guest, user).await;
    }
    // The pending order belonged to the guest cart.
    session
        .remove::<OrderId>(session_keys::PENDING_ORDER)
        .await?;

    let current = CurrentUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext, Query(query): Query<NextQuery>) -> Response {
    if page.user.is_some() {
        return Redirect::to(safe_next(query.next.as_deref())).into_response();
    }

    LoginTemplate {
        page,
        form: LoginForm {
            next: query.next,
            ..LoginForm::default()
        },
        errors: FormErrors::default(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, page, session, form))]
pub async fn login(
    State(state): State<AppState>,
    page: PageContext,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let rerender = |page: PageContext, form: LoginForm, errors: FormErrors, status: StatusCode| {
        let form = LoginForm {
            password: String::new(),
            ..form
        };
        (status, LoginTemplate { page, form, errors }).into_response()
    };

    let email = match form.validate() {
        Ok(email) => email,
        Err(errors) => return Ok(rerender(page, form, errors, StatusCode::UNPROCESSABLE_ENTITY)),
    };

    let user = match state.backend().login(email.as_str(), &form.password).await {
        Ok(user) => user,
        Err(e) if e.is_unauthorized() || matches!(e, BackendError::NotFound(_)) => {
            tracing::info!("Login rejected");
            let mut errors = FormErrors::default();
            errors.add("email", "Invalid email or password");
            return Ok(rerender(page, form, errors, StatusCode::UNAUTHORIZED));
        }
        Err(e) => return Err(e.into()),
    };

    log_in(&state, &session, &user).await?;
    set_flash(&session, Flash::success(format!("Welcome back, {}!", user.name))).await;

    Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: PageContext) -> Response {
    if page.user.is_some() {
        return Redirect::to("/").into_response();
    }

    RegisterTemplate {
        page,
        form: RegisterForm::default(),
        errors: FormErrors::default(),
    }
    .into_response()
}

/// Handle registration form submission.
///
/// A new account is logged in straight away.
#[instrument(skip(state, page, session, form))]
pub async fn register(
    State(state): State<AppState>,
    page: PageContext,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let rerender = |page: PageContext, form: RegisterForm, errors: FormErrors| {
        let form = RegisterForm {
            password: String::new(),
            password_confirm: String::new(),
            ..form
        };
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate { page, form, errors },
        )
            .into_response()
    };

    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => return Ok(rerender(page, form, errors)),
    };

    let user = match state
        .backend()
        .register(
            &registration.name,
            registration.email.as_str(),
            registration.password.expose(),
        )
        .await
    {
        Ok(user) => user,
        Err(e) => match e.user_message() {
            Some(message) => {
                tracing::info!("Registration rejected: {message}");
                let mut errors = FormErrors::default();
                errors.add("email", message);
                return Ok(rerender(page, form, errors));
            }
            None => return Err(e.into()),
        },
    };

    log_in(&state, &session, &user).await?;
    set_flash(&session, Flash::success(format!("Welcome, {}!", user.name))).await;

    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Log out and drop the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
