//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to /users
//! GET  /health                 - Health check
//!
//! # Users (requires admin)
//! GET  /users                  - User table (?q=&role=&page=&per_page=)
//! GET  /users/new              - Add user form
//! POST /users                  - Create user
//! GET  /users/{id}/edit        - Edit user form
//! POST /users/{id}             - Update user
//! POST /users/{id}/delete      - Delete user
//! POST /users/bulk-delete      - Delete selected users
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! POST /auth/logout            - Logout action
//! ```

pub mod auth;
pub mod users;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the user management routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route("/new", get(users::new_user))
        .route("/bulk-delete", post(users::bulk_delete))
        .route("/{id}", post(users::update))
        .route("/{id}/edit", get(users::edit))
        .route("/{id}/delete", post(users::delete))
}

/// Create all routes for admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/users") }))
        .nest("/users", user_routes())
        .nest("/auth", auth_routes())
}
