//! HTTP middleware and request extractors for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, in-memory store)

pub mod auth;
pub mod cart_owner;
pub mod flash;
pub mod page;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use cart_owner::Owner;
pub use flash::{set_flash, take_flash};
pub use page::PageContext;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
