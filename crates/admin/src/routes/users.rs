//! User management route handlers.
//!
//! The table is filtered and paginated in process from the backend's full
//! user list. Mutations redirect back to the table with a banner.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, RawForm, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{UserId, UserRole};

use crate::backend::{BackendError, User, UserPayload};
use crate::components::{Page, Pagination, Selection, UserFilter};
use crate::error::{AppError, Result};
use crate::forms::{FormErrors, FormMode, UserForm};
use crate::middleware::{PageContext, RequireAdminAuth, set_flash};
use crate::models::{CurrentAdmin, Flash};
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Table query string. Values stay raw so bad input falls back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

// =============================================================================
// View Types
// =============================================================================

/// One table row.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: &'static str,
    pub phone: String,
    pub created: String,
    /// The signed-in admin's own row, which cannot be deleted.
    pub is_self: bool,
}

impl UserRow {
    fn new(user: User, admin: &CurrentAdmin) -> Self {
        Self {
            id: user.id,
            is_self: user.id == admin.id,
            role: user.role.label(),
            phone: user.phone.unwrap_or_default(),
            created: user
                .created_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            email: user.email.into_inner(),
            name: user.name,
        }
    }
}

/// Entry in the role dropdown.
#[derive(Debug, Clone)]
pub struct RoleOption {
    pub value: String,
    pub label: &'static str,
    pub selected: bool,
}

fn role_options(selected: Option<UserRole>) -> Vec<RoleOption> {
    UserRole::ALL
        .into_iter()
        .map(|role| RoleOption {
            value: role.to_string(),
            label: role.label(),
            selected: selected == Some(role),
        })
        .collect()
}

/// Numbered pager link.
#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

/// Pager state for the template.
#[derive(Debug, Clone)]
pub struct Pager {
    pub links: Vec<PageLink>,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub first_row: usize,
    pub last_row: usize,
    pub total: usize,
}

/// `/users` link keeping the current filter and page size.
fn list_href(filter: &UserFilter, per_page: usize, page: usize) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if !filter.query.is_empty() {
        query.append_pair("q", &filter.query);
    }
    if let Some(role) = filter.role {
        query.append_pair("role", &role.to_string());
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    if per_page != Pagination::default().per_page {
        query.append_pair("per_page", &per_page.to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        "/users".to_string()
    } else {
        format!("/users?{query}")
    }
}

impl Pager {
    fn new<T>(page: &Page<T>, filter: &UserFilter) -> Self {
        let href = |n: usize| list_href(filter, page.per_page, n);
        Self {
            links: page
                .window()
                .into_iter()
                .map(|number| PageLink {
                    number,
                    href: href(number),
                    current: number == page.page,
                })
                .collect(),
            prev_href: page.has_prev().then(|| href(page.prev_page())),
            next_href: page.has_next().then(|| href(page.next_page())),
            first_row: page.first_row(),
            last_row: page.last_row(),
            total: page.total,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// User table template.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub page: PageContext,
    pub rows: Vec<UserRow>,
    pub filter: UserFilter,
    pub roles: Vec<RoleOption>,
    pub per_page: usize,
    pub pager: Pager,
}

/// Add/edit user template.
#[derive(Template, WebTemplate)]
#[template(path = "users/form.html")]
pub struct UserFormTemplate {
    pub page: PageContext,
    pub title: String,
    pub action: String,
    pub is_edit: bool,
    pub form: UserForm,
    pub roles: Vec<RoleOption>,
    pub errors: FormErrors,
}

impl UserFormTemplate {
    fn create(page: PageContext, form: UserForm, errors: FormErrors) -> Self {
        Self {
            page,
            title: "Add user".to_string(),
            action: "/users".to_string(),
            is_edit: false,
            roles: role_options(form.role.parse().ok()),
            form: UserForm {
                password: String::new(),
                ..form
            },
            errors,
        }
    }

    fn edit(page: PageContext, id: UserId, form: UserForm, errors: FormErrors) -> Self {
        Self {
            page,
            title: format!("Edit {}", form.name.trim()),
            action: format!("/users/{id}"),
            is_edit: true,
            roles: role_options(form.role.parse().ok()),
            form: UserForm {
                password: String::new(),
                ..form
            },
            errors,
        }
    }
}

/// Attach a 4xx backend message to the form, or give up with the error.
fn backend_rejection(e: BackendError) -> std::result::Result<FormErrors, AppError> {
    match e.user_message() {
        Some(message) => {
            tracing::info!("Backend rejected user form: {message}");
            let mut errors = FormErrors::default();
            errors.add("email", message);
            Ok(errors)
        }
        None => Err(e.into()),
    }
}

// =============================================================================
// List
// =============================================================================

/// User table with search, role filter and pagination.
#[instrument(skip(admin, state, page))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<UserListQuery>,
) -> Result<UsersIndexTemplate> {
    let filter = UserFilter::from_query(query.q.as_deref(), query.role.as_deref());
    let pagination = Pagination::from_query(query.page.as_deref(), query.per_page.as_deref());

    let users = state.backend().list_users().await?;
    let results = pagination.apply(filter.apply(users));
    let pager = Pager::new(&results, &filter);

    Ok(UsersIndexTemplate {
        rows: results
            .items
            .into_iter()
            .map(|user| UserRow::new(user, &admin))
            .collect(),
        roles: role_options(filter.role),
        per_page: results.per_page,
        filter,
        pager,
        page,
    })
}

// =============================================================================
// Create
// =============================================================================

/// Blank add-user form.
pub async fn new_user(_admin: RequireAdminAuth, page: PageContext) -> UserFormTemplate {
    let form = UserForm {
        role: UserRole::Customer.to_string(),
        ..UserForm::default()
    };
    UserFormTemplate::create(page, form, FormErrors::default())
}

/// Create a user.
#[instrument(skip(_admin, state, page, session, form))]
pub async fn create(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
    page: PageContext,
    session: Session,
    Form(form): Form<UserForm>,
) -> Result<Response> {
    let payload = match form.validate(FormMode::Create) {
        Ok(payload) => payload,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                UserFormTemplate::create(page, form, errors),
            )
                .into_response());
        }
    };

    let user = match state.backend().create_user(&payload).await {
        Ok(user) => user,
        Err(e) => {
            let errors = backend_rejection(e)?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                UserFormTemplate::create(page, form, errors),
            )
                .into_response());
        }
    };

    tracing::info!(user_id = %user.id, "User created");
    set_flash(&session, Flash::success(format!("Added {}", user.name))).await;
    Ok(Redirect::to("/users").into_response())
}

// =============================================================================
// Edit
// =============================================================================

/// Edit form prefilled from the backend.
#[instrument(skip(_admin, state, page))]
pub async fn edit(
    _admin: RequireAdminAuth,
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<UserId>,
) -> Result<UserFormTemplate> {
    let user = state.backend().get_user(id).await?;
    Ok(UserFormTemplate::edit(
        page,
        id,
        UserForm::from_user(&user),
        FormErrors::default(),
    ))
}

/// Admins may not take away their own admin role.
fn check_self_demotion(admin: &CurrentAdmin, id: UserId, payload: &UserPayload) -> FormErrors {
    let mut errors = FormErrors::default();
    if admin.id == id && payload.role != UserRole::Admin {
        errors.add("role", "You cannot remove your own admin access");
    }
    errors
}

/// Update a user. A blank password keeps the existing one.
#[instrument(skip(admin, state, page, session, form))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    page: PageContext,
    session: Session,
    Path(id): Path<UserId>,
    Form(form): Form<UserForm>,
) -> Result<Response> {
    let rejected = |page: PageContext, form: UserForm, errors: FormErrors| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            UserFormTemplate::edit(page, id, form, errors),
        )
            .into_response()
    };

    let payload = match form.validate(FormMode::Edit) {
        Ok(payload) => payload,
        Err(errors) => return Ok(rejected(page, form, errors)),
    };

    let errors = check_self_demotion(&admin, id, &payload);
    if !errors.is_empty() {
        return Ok(rejected(page, form, errors));
    }

    let user = match state.backend().update_user(id, &payload).await {
        Ok(user) => user,
        Err(e @ BackendError::NotFound(_)) => return Err(e.into()),
        Err(e) => {
            let errors = backend_rejection(e)?;
            return Ok(rejected(page, form, errors));
        }
    };

    tracing::info!(user_id = %user.id, "User updated");
    set_flash(&session, Flash::success(format!("Saved {}", user.name))).await;
    Ok(Redirect::to("/users").into_response())
}

// =============================================================================
// Delete
// =============================================================================

/// Delete one user.
#[instrument(skip(admin, state, session))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<UserId>,
) -> Redirect {
    let flash = if id == admin.id {
        Flash::error("You cannot delete your own account")
    } else {
        match state.backend().delete_user(id).await {
            Ok(()) => {
                tracing::info!(user_id = %id, "User deleted");
                Flash::success("User deleted")
            }
            Err(BackendError::NotFound(_)) => Flash::error("That user no longer exists"),
            Err(e) => {
                tracing::error!(user_id = %id, "Failed to delete user: {e}");
                Flash::error("Could not delete the user, please try again")
            }
        }
    };

    set_flash(&session, flash).await;
    Redirect::to("/users")
}

/// Banner text summarising a bulk delete.
fn bulk_delete_summary(deleted: usize, failed: usize, skipped_self: bool) -> Flash {
    let mut message = match deleted {
        1 => "Deleted 1 user".to_string(),
        n => format!("Deleted {n} users"),
    };
    if failed > 0 {
        message.push_str(&format!(", {failed} could not be deleted"));
    }
    if skipped_self {
        message.push_str(", your own account was skipped");
    }

    if failed > 0 || deleted == 0 {
        Flash::error(message)
    } else {
        Flash::success(message)
    }
}

/// Delete every ticked user.
///
/// Deletes run one at a time; a failure does not stop the rest.
#[instrument(skip(admin, state, session, body))]
pub async fn bulk_delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    RawForm(body): RawForm,
) -> Redirect {
    let selection = Selection::from_form(&body, admin.id);

    if selection.is_empty() {
        let message = if selection.skipped_self() {
            "You cannot delete your own account"
        } else {
            "No users selected"
        };
        set_flash(&session, Flash::error(message)).await;
        return Redirect::to("/users");
    }

    let mut deleted = 0;
    let mut failed = 0;
    for id in selection.ids() {
        match state.backend().delete_user(id).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                tracing::warn!(user_id = %id, "Bulk delete failed: {e}");
                failed += 1;
            }
        }
    }
    tracing::info!(deleted, failed, "Bulk delete finished");

    set_flash(
        &session,
        bulk_delete_summary(deleted, failed, selection.skipped_self()),
    )
    .await;
    Redirect::to("/users")
}
