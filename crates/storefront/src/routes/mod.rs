//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (category and subcategory carousels)
//! GET  /health                 - Health check
//!
//! # Catalogue
//! GET  /categories/{id}        - Subcategories, each with a product carousel
//! GET  /subcategories/{id}     - Product grid
//! GET  /products/{id}          - Product detail
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart
//! POST /cart/update            - Update quantity (0 removes the line)
//! POST /cart/remove            - Remove a line
//!
//! # Checkout
//! GET  /checkout               - Reconcile the abandoned order, billing form
//! POST /checkout               - Place the order
//!
//! # Orders
//! GET  /orders                 - Order history (requires login)
//! GET  /orders/{id}            - Order detail / confirmation
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod home;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/categories/{id}", get(catalog::category))
        .route("/subcategories/{id}", get(catalog::subcategory))
        .route("/products/{id}", get(catalog::product))
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
}
