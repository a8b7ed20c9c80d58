//! Carousel view state.
//!
//! Carousels are rendered server-side. The current index of each carousel
//! travels in the query string (`?c<id>=<index>`), so the previous/next
//! buttons are plain links and several carousels on one page move
//! independently.

use std::collections::HashMap;

/// Query-string state for every carousel on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarouselState {
    positions: HashMap<String, usize>,
}

impl CarouselState {
    /// Read carousel positions from raw query parameters.
    ///
    /// Keys that are not `c<id>` or values that are not non-negative integers
    /// are ignored.
    #[must_use]
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let positions = query
            .iter()
            .filter_map(|(key, value)| {
                let id = key.strip_prefix('c').filter(|id| !id.is_empty())?;
                let index = value.trim().parse::<usize>().ok()?;
                Some((id.to_string(), index))
            })
            .collect();
        Self { positions }
    }

    /// Raw requested index for a carousel (0 when absent).
    #[must_use]
    pub fn position(&self, id: &str) -> usize {
        self.positions.get(id).copied().unwrap_or(0)
    }

    /// Query string for the page with `id` moved to `index` and every other
    /// carousel left where it is.
    #[must_use]
    pub fn query_with(&self, id: &str, index: usize) -> String {
        let mut pairs: Vec<(&str, usize)> = self
            .positions
            .iter()
            .filter(|(key, pos)| key.as_str() != id && **pos > 0)
            .map(|(key, pos)| (key.as_str(), *pos))
            .collect();
        if index > 0 {
            pairs.push((id, index));
        }
        pairs.sort_unstable();

        if pairs.is_empty() {
            return String::new();
        }

        let joined = pairs
            .iter()
            .map(|(key, pos)| format!("c{key}={pos}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{joined}")
    }

    /// Build a carousel over `slides`, positioned from this state.
    #[must_use]
    pub fn carousel<T: Clone>(&self, id: &str, slides: Vec<T>, visible: usize) -> Carousel<T> {
        Carousel::new(id, slides, visible).at(self.position(id))
    }
}

/// A wrap-around carousel over a list of slides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carousel<T> {
    id: String,
    slides: Vec<T>,
    index: usize,
    visible: usize,
}

impl<T: Clone> Carousel<T> {
    /// Create a carousel showing `visible` slides at a time (at least one).
    #[must_use]
    pub fn new(id: &str, slides: Vec<T>, visible: usize) -> Self {
        Self {
            id: id.to_string(),
            slides,
            index: 0,
            visible: visible.max(1),
        }
    }

    /// Move to `index`, wrapping modulo the number of slides.
    #[must_use]
    pub fn at(mut self, index: usize) -> Self {
        self.index = if self.slides.is_empty() {
            0
        } else {
            index % self.slides.len()
        };
        self
    }

    /// Carousel id used in the query string.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of slides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Whether there are no slides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Whether the slides do not all fit in the window, so navigation is
    /// worth showing.
    #[must_use]
    pub fn is_scrollable(&self) -> bool {
        self.slides.len() > self.visible
    }

    /// Index after advancing one slide.
    #[must_use]
    pub fn next_index(&self) -> usize {
        if self.slides.is_empty() {
            0
        } else {
            (self.index + 1) % self.slides.len()
        }
    }

    /// Index after going back one slide.
    #[must_use]
    pub fn prev_index(&self) -> usize {
        match self.slides.len() {
            0 => 0,
            len => (self.index + len - 1) % len,
        }
    }

    /// The visible slides: `min(visible, len)` slides starting at the
    /// current index, wrapping past the end.
    #[must_use]
    pub fn window(&self) -> Vec<T> {
        let len = self.slides.len();
        let count = self.visible.min(len);
        self.slides
            .iter()
            .cycle()
            .skip(self.index)
            .take(count)
            .cloned()
            .collect()
    }
}

/// Carousel data for templates.
#[derive(Debug, Clone)]
pub struct CarouselView<T> {
    pub id: String,
    pub slides: Vec<T>,
    pub scrollable: bool,
    pub prev_href: String,
    pub next_href: String,
    pub position: usize,
    pub total: usize,
}

impl<T: Clone> CarouselView<T> {
    /// Render a carousel for a page at `path` with the page's carousel state.
    #[must_use]
    pub fn new(carousel: &Carousel<T>, state: &CarouselState, path: &str) -> Self {
        Self {
            id: carousel.id().to_string(),
            slides: carousel.window(),
            scrollable: carousel.is_scrollable(),
            prev_href: format!(
                "{path}{}",
                state.query_with(carousel.id(), carousel.prev_index())
            ),
            next_href: format!(
                "{path}{}",
                state.query_with(carousel.id(), carousel.next_index())
            ),
            position: carousel.index() + 1,
            total: carousel.len(),
        }
    }

    /// Whether there is anything to render.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> Vec<char> {
        vec!['a', 'b', 'c', 'd', 'e']
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let carousel = Carousel::new("x", letters(), 3).at(4);
        assert_eq!(carousel.next_index(), 0);
        assert_eq!(carousel.prev_index(), 3);

        let first = Carousel::new("x", letters(), 3);
        assert_eq!(first.prev_index(), 4);
    }

    #[test]
    fn test_window_wraps_around() {
        let carousel = Carousel::new("x", letters(), 3).at(3);
        assert_eq!(carousel.window(), vec!['d', 'e', 'a']);
    }

    #[test]
    fn test_window_never_exceeds_len() {
        let carousel = Carousel::new("x", vec![1, 2], 4);
        assert_eq!(carousel.window(), vec![1, 2]);
        assert!(!carousel.is_scrollable());
    }

    #[test]
    fn test_out_of_range_index_is_normalised() {
        let carousel = Carousel::new("x", letters(), 1).at(12);
        assert_eq!(carousel.index(), 2);
        assert_eq!(carousel.window(), vec!['c']);
    }

    #[test]
    fn test_empty_carousel() {
        let carousel: Carousel<u8> = Carousel::new("x", vec![], 3).at(7);
        assert!(carousel.is_empty());
        assert_eq!(carousel.index(), 0);
        assert_eq!(carousel.next_index(), 0);
        assert_eq!(carousel.prev_index(), 0);
        assert!(carousel.window().is_empty());
    }

    #[test]
    fn test_zero_visible_shows_one() {
        let carousel = Carousel::new("x", letters(), 0);
        assert_eq!(carousel.window(), vec!['a']);
    }

    #[test]
    fn test_state_ignores_junk_parameters() {
        let query: HashMap<String, String> = [
            ("c1", "2"),
            ("c", "4"),
            ("c2", "-1"),
            ("page", "3"),
            ("csub-7", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let state = CarouselState::from_query(&query);
        assert_eq!(state.position("1"), 2);
        assert_eq!(state.position("2"), 0);
        assert_eq!(state.position("sub-7"), 1);
        assert_eq!(state.position("page"), 0);
    }

    #[test]
    fn test_query_with_keeps_other_carousels() {
        let query: HashMap<String, String> = [("c1", "2"), ("c2", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let state = CarouselState::from_query(&query);

        assert_eq!(state.query_with("2", 3), "?c1=2&c2=3");
        assert_eq!(state.query_with("2", 0), "?c1=2");
        assert_eq!(CarouselState::default().query_with("1", 0), "");
    }

    #[test]
    fn test_view_links() {
        let state = CarouselState::default();
        let carousel = state.carousel("cats", letters(), 2);
        let view = CarouselView::new(&carousel, &state, "/");

        assert_eq!(view.slides, vec!['a', 'b']);
        assert_eq!(view.next_href, "/?ccats=1");
        assert_eq!(view.prev_href, "/?ccats=4");
        assert!(view.scrollable);
        assert_eq!(view.position, 1);
        assert_eq!(view.total, 5);
    }
}
