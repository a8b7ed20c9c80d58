//! User table filtering, pagination and row selection.
//!
//! The backend returns the full user list, so the table is filtered and
//! paginated in process before rendering.

use std::collections::BTreeSet;

use bazaar_core::{UserId, UserRole};

use crate::backend::User;

/// Rows per page when the query does not say.
pub const DEFAULT_PER_PAGE: usize = 10;

/// Upper bound on rows per page.
pub const MAX_PER_PAGE: usize = 100;

/// Most page numbers shown in the pager.
const PAGE_WINDOW: usize = 5;

/// Search box and role dropdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring of name or email.
    pub query: String,
    pub role: Option<UserRole>,
}

impl UserFilter {
    /// Build a filter from raw query-string values.
    ///
    /// An unknown role is treated as "any role".
    #[must_use]
    pub fn from_query(query: Option<&str>, role: Option<&str>) -> Self {
        Self {
            query: query.map(str::trim).unwrap_or_default().to_string(),
            role: role.and_then(|r| r.parse().ok()),
        }
    }

    /// Whether any criterion is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.role.is_some()
    }

    /// Whether `user` passes the filter.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| role != user.role) {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        user.name.to_lowercase().contains(&needle)
            || user.email.as_str().to_lowercase().contains(&needle)
    }

    /// Keep the users that pass, preserving order.
    #[must_use]
    pub fn apply(&self, users: Vec<User>) -> Vec<User> {
        users.into_iter().filter(|u| self.matches(u)).collect()
    }

    /// Selected role as the dropdown value.
    #[must_use]
    pub fn role_value(&self) -> String {
        self.role.map(|r| r.to_string()).unwrap_or_default()
    }
}

/// Requested page and page size, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Parse `page` and `per_page` query values.
    ///
    /// Missing or unparsable values fall back to page 1 and the default
    /// page size.
    #[must_use]
    pub fn from_query(page: Option<&str>, per_page: Option<&str>) -> Self {
        let page = page.and_then(|p| p.trim().parse().ok()).unwrap_or(1);
        let per_page = per_page
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PER_PAGE);
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Slice `items` into the requested page.
    ///
    /// `page` is clamped to the last page, so a page past the end shows the
    /// final rows instead of nothing.
    #[must_use]
    pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let total = items.len();
        let total_pages = total.div_ceil(per_page).max(1);
        let page = page.clamp(1, total_pages);

        let items = items
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Page {
            items,
            page,
            per_page,
            total_pages,
            total,
        }
    }

    /// Apply this pagination to `items`.
    #[must_use]
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        Self::paginate(items, self.page, self.per_page)
    }
}

/// One page of rows plus what the pager needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based current page.
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    /// Rows across all pages.
    pub total: usize,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn prev_page(&self) -> usize {
        self.page.saturating_sub(1)
    }

    #[must_use]
    pub const fn next_page(&self) -> usize {
        self.page + 1
    }

    /// 1-based index of the first row on this page (0 when empty).
    #[must_use]
    pub const fn first_row(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.page - 1) * self.per_page + 1
        }
    }

    /// 1-based index of the last row on this page.
    #[must_use]
    pub fn last_row(&self) -> usize {
        self.first_row() + self.items.len().saturating_sub(1)
    }

    /// Page numbers to link, centred on the current page where possible.
    #[must_use]
    pub fn window(&self) -> Vec<usize> {
        let half = PAGE_WINDOW / 2;
        let end = (self.page.saturating_sub(half).max(1) + PAGE_WINDOW - 1).min(self.total_pages);
        let start = end.saturating_sub(PAGE_WINDOW - 1).max(1);
        (start..=end).collect()
    }
}

/// Rows ticked for bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<UserId>,
    skipped_self: bool,
}

impl Selection {
    /// Collect ids, dropping duplicates and the signed-in admin.
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = UserId>, current_admin: UserId) -> Self {
        let mut ids: BTreeSet<UserId> = ids.into_iter().collect();
        let skipped_self = ids.remove(&current_admin);
        Self { ids, skipped_self }
    }

    /// Parse repeated `ids` fields from an urlencoded form body.
    ///
    /// Values that are not integers are ignored.
    #[must_use]
    pub fn from_form(body: &[u8], current_admin: UserId) -> Self {
        let ids = url::form_urlencoded::parse(body)
            .filter(|(key, _)| key == "ids")
            .filter_map(|(_, value)| value.parse::<UserId>().ok());
        Self::new(ids, current_admin)
    }

    /// Ids to delete, ascending.
    pub fn ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.ids.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether the admin ticked their own row.
    #[must_use]
    pub const fn skipped_self(&self) -> bool {
        self.skipped_self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use bazaar_core::Email;

    use super::*;

    fn user(id: i64, name: &str, email: &str, role: UserRole) -> User {
        User {
            id: UserId::new(id),
            name: name.to_string(),
            email: Email::parse(email).unwrap(),
            role,
            phone: None,
            created_at: None,
        }
    }

    fn users() -> Vec<User> {
        vec![
            user(1, "Ada Lovelace", "ada@example.com", UserRole::Admin),
            user(2, "Grace Hopper", "grace@navy.example", UserRole::Customer),
            user(3, "Alan Turing", "alan@example.com", UserRole::Customer),
        ]
    }

    #[test]
    fn test_filter_matches_name_or_email_ignoring_case() {
        let filter = UserFilter::from_query(Some("  NAVY "), None);
        let found = filter.apply(users());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Grace Hopper");

        let filter = UserFilter::from_query(Some("lovelace"), None);
        assert_eq!(filter.apply(users())[0].id, UserId::new(1));
    }

    #[test]
    fn test_filter_by_role() {
        let filter = UserFilter::from_query(Some("a"), Some("customer"));
        let ids: Vec<_> = filter.apply(users()).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![UserId::new(2), UserId::new(3)]);
    }

    #[test]
    fn test_blank_filter_matches_all() {
        let filter = UserFilter::from_query(Some(""), Some("superuser"));
        assert!(!filter.is_active());
        assert_eq!(filter.apply(users()).len(), 3);
    }

    #[test]
    fn test_paginate_slices_and_counts() {
        let page = Pagination::paginate((1..=23).collect::<Vec<_>>(), 3, 10);
        assert_eq!(page.items, vec![21, 22, 23]);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total, 23);
        assert_eq!(page.first_row(), 21);
        assert_eq!(page.last_row(), 23);
        assert!(page.has_prev());
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_is_clamped() {
        let page = Pagination::paginate((1..=15).collect::<Vec<_>>(), 9, 10);
        assert_eq!(page.page, 2);
        assert_eq!(page.items, vec![11, 12, 13, 14, 15]);

        let page = Pagination::paginate((1..=15).collect::<Vec<_>>(), 0, 10);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_per_page_is_clamped() {
        let page = Pagination::paginate((1..=300).collect::<Vec<_>>(), 1, 500);
        assert_eq!(page.per_page, MAX_PER_PAGE);
        assert_eq!(page.items.len(), 100);

        let page = Pagination::paginate(vec![1, 2, 3], 2, 0);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.items, vec![2]);
    }

    #[test]
    fn test_empty_list_is_one_empty_page() {
        let page = Pagination::paginate(Vec::<u8>::new(), 4, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.first_row(), 0);
        assert_eq!(page.window(), vec![1]);
    }

    #[test]
    fn test_from_query_defaults() {
        assert_eq!(Pagination::from_query(None, None), Pagination::default());
        let p = Pagination::from_query(Some("abc"), Some("-3"));
        assert_eq!(p, Pagination::default());
        assert_eq!(Pagination::from_query(Some("0"), Some("1000")).per_page, 100);
    }

    #[test]
    fn test_window_centres_on_current_page() {
        let items: Vec<_> = (1..=100).collect();
        assert_eq!(Pagination::paginate(items.clone(), 1, 10).window(), vec![1, 2, 3, 4, 5]);
        assert_eq!(Pagination::paginate(items.clone(), 6, 10).window(), vec![4, 5, 6, 7, 8]);
        assert_eq!(Pagination::paginate(items.clone(), 10, 10).window(), vec![6, 7, 8, 9, 10]);
        assert_eq!(Pagination::paginate(items, 2, 40).window(), vec![1, 2, 3]);
    }

    #[test]
    fn test_selection_dedupes_and_protects_self() {
        let selection = Selection::from_form(b"ids=3&ids=1&ids=3&ids=x&other=9&ids=7", UserId::new(7));
        assert_eq!(
            selection.ids().collect::<Vec<_>>(),
            vec![UserId::new(1), UserId::new(3)]
        );
        assert!(selection.skipped_self());
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_empty_selection() {
        let selection = Selection::new([UserId::new(5)], UserId::new(5));
        assert!(selection.is_empty());
        assert!(selection.skipped_self());
    }
}
