//! Session-held models for the admin panel.

pub mod session;

pub use session::{CurrentAdmin, Flash, FlashKind, keys as session_keys};
