//! Home page route handler.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tracing::instrument;

use crate::carousel::{CarouselState, CarouselView};
use crate::error::Result;
use crate::middleware::PageContext;
use crate::state::AppState;

use super::catalog::{CAROUSEL_VISIBLE, TileView};

/// Carousel id of the top category strip.
const CATEGORY_CAROUSEL: &str = "categories";

/// A category heading with a carousel of its subcategories.
#[derive(Debug, Clone)]
pub struct CategoryShelfView {
    pub tile: TileView,
    pub carousel: CarouselView<TileView>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub categories: CarouselView<TileView>,
    pub shelves: Vec<CategoryShelfView>,
}

/// Display the home page.
///
/// One carousel of every category, then one carousel of subcategories per
/// category. Categories without subcategories get no shelf.
#[instrument(skip(state, page, query))]
pub async fn home(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<HashMap<String, String>>,
) -> Result<HomeTemplate> {
    let backend = state.backend();
    let categories = backend.list_categories().await?;
    let subcategories = backend.list_subcategories(None).await?;
    let carousels = CarouselState::from_query(&query);

    let tiles = categories.iter().map(TileView::from).collect();
    let strip = carousels.carousel(CATEGORY_CAROUSEL, tiles, CAROUSEL_VISIBLE);

    let shelves = categories
        .iter()
        .filter_map(|category| {
            let tiles: Vec<TileView> = subcategories
                .iter()
                .filter(|sub| sub.category_id == category.id)
                .map(TileView::from)
                .collect();
            if tiles.is_empty() {
                return None;
            }
            let carousel =
                carousels.carousel(&format!("cat{}", category.id), tiles, CAROUSEL_VISIBLE);
            Some(CategoryShelfView {
                tile: TileView::from(category),
                carousel: CarouselView::new(&carousel, &carousels, "/"),
            })
        })
        .collect();

    Ok(HomeTemplate {
        page,
        categories: CarouselView::new(&strip, &carousels, "/"),
        shelves,
    })
}
