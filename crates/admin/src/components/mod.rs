//! Reusable admin UI components.

pub mod table;

pub use table::{Page, Pagination, Selection, UserFilter};
