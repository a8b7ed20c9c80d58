//! Authentication route handlers for admin.
//!
//! Credentials are checked by the REST backend; only accounts with the
//! admin role may sign in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::UserRole;

use crate::backend::BackendError;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::forms::{FormErrors, LoginForm};
use crate::middleware::{PageContext, clear_current_admin, set_current_admin, set_flash};
use crate::models::{CurrentAdmin, Flash};
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub form: LoginForm,
    pub errors: FormErrors,
}

fn rerender(page: PageContext, form: LoginForm, errors: FormErrors, status: StatusCode) -> Response {
    let form = LoginForm {
        password: String::new(),
        ..form
    };
    (status, LoginTemplate { page, form, errors }).into_response()
}

/// Display the login page.
pub async fn login_page(page: PageContext) -> Response {
    if page.admin.is_some() {
        return Redirect::to("/users").into_response();
    }

    LoginTemplate {
        page,
        form: LoginForm::default(),
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
    let email = match form.validate() {
        Ok(email) => email,
        Err(errors) => {
            return Ok(rerender(page, form, errors, StatusCode::UNPROCESSABLE_ENTITY));
        }
    };

    let user = match state.backend().login(email.as_str(), &form.password).await {
        Ok(user) => user,
        Err(e) if e.is_unauthorized() || matches!(e, BackendError::NotFound(_)) => {
            tracing::info!("Admin login rejected");
            let mut errors = FormErrors::default();
            errors.add("email", "Invalid email or password");
            return Ok(rerender(page, form, errors, StatusCode::UNAUTHORIZED));
        }
        Err(e) => return Err(e.into()),
    };

    if user.role != UserRole::Admin {
        tracing::warn!(user_id = %user.id, "Non-admin account tried to sign in");
        let mut errors = FormErrors::default();
        errors.add("email", "This account does not have admin access");
        return Ok(rerender(page, form, errors, StatusCode::FORBIDDEN));
    }

    set_current_admin(&session, &CurrentAdmin::from(&user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "Admin logged in");
    set_flash(&session, Flash::success(format!("Signed in as {}", user.name))).await;

    Ok(Redirect::to("/users").into_response())
}

/// Logout and clear session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login"))
}
