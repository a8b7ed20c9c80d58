//! Catalogue route handlers: categories, subcategories and products.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{OriginalUri, Path, Query, State};
use tracing::instrument;

use bazaar_core::{CategoryId, ProductId, SubCategoryId};

use crate::backend::{Category, Product, SubCategory};
use crate::carousel::{CarouselState, CarouselView};
use crate::error::Result;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Slides shown at once in a catalogue carousel.
pub const CAROUSEL_VISIBLE: usize = 4;

// =============================================================================
// View Types
// =============================================================================

/// Category or subcategory tile.
#[derive(Debug, Clone)]
pub struct TileView {
    pub name: String,
    pub href: String,
    pub image_url: Option<String>,
}

impl From<&Category> for TileView {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            href: format!("/categories/{}", category.id),
            image_url: category.image_url.clone(),
        }
    }
}

impl From<&SubCategory> for TileView {
    fn from(subcategory: &SubCategory) -> Self {
        Self {
            name: subcategory.name.clone(),
            href: format!("/subcategories/{}", subcategory.id),
            image_url: subcategory.image_url.clone(),
        }
    }
}

/// Product card display data.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub id: ProductId,
    pub name: String,
    pub href: String,
    pub image_url: Option<String>,
    /// Price the customer pays.
    pub price: String,
    /// Undiscounted price, shown struck through when a discount applies.
    pub compare_at_price: Option<String>,
    pub discount_label: Option<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        let discounted = product.discount.is_active();
        Self {
            id: product.id,
            name: product.name.clone(),
            href: format!("/products/{}", product.id),
            image_url: product.image_url.clone(),
            price: product.discounted_price().to_string(),
            compare_at_price: discounted.then(|| product.price.to_string()),
            discount_label: discounted.then(|| format!("-{}", product.discount)),
            in_stock: product.in_stock(),
        }
    }
}

/// Product detail display data.
#[derive(Debug, Clone)]
pub struct ProductDetailView {
    pub card: ProductCardView,
    pub description: String,
    pub stock: u32,
    pub subcategory_href: String,
}

/// A subcategory heading with a carousel of its products.
#[derive(Debug, Clone)]
pub struct ProductShelfView {
    pub tile: TileView,
    pub carousel: CarouselView<ProductCardView>,
}

// =============================================================================
// Templates
// =============================================================================

/// Category page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/category.html")]
pub struct CategoryTemplate {
    pub page: PageContext,
    pub category: TileView,
    pub shelves: Vec<ProductShelfView>,
}

/// Subcategory product grid template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/subcategory.html")]
pub struct SubCategoryTemplate {
    pub page: PageContext,
    pub subcategory: TileView,
    pub category_href: String,
    pub products: Vec<ProductCardView>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/product.html")]
pub struct ProductTemplate {
    pub page: PageContext,
    pub product: ProductDetailView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display a category: one product carousel per subcategory.
#[instrument(skip(state, page, query, uri))]
pub async fn category(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<CategoryId>,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
) -> Result<CategoryTemplate> {
    let backend = state.backend();
    let category = backend.get_category(id).await?;
    let subcategories = backend.list_subcategories(Some(id)).await?;
    let carousels = CarouselState::from_query(&query);

    let mut shelves = Vec::with_capacity(subcategories.len());
    for subcategory in &subcategories {
        let products = backend.list_products(Some(subcategory.id)).await?;
        let cards = products.iter().map(ProductCardView::from).collect();
        let carousel =
            carousels.carousel(&format!("sub{}", subcategory.id), cards, CAROUSEL_VISIBLE);
        shelves.push(ProductShelfView {
            tile: TileView::from(subcategory),
            carousel: CarouselView::new(&carousel, &carousels, uri.path()),
        });
    }

    Ok(CategoryTemplate {
        page,
        category: TileView::from(&category),
        shelves,
    })
}

/// Display all products of a subcategory as a grid.
#[instrument(skip(state, page))]
pub async fn subcategory(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<SubCategoryId>,
) -> Result<SubCategoryTemplate> {
    let backend = state.backend();
    let subcategory = backend.get_subcategory(id).await?;
    let products = backend.list_products(Some(id)).await?;

    Ok(SubCategoryTemplate {
        page,
        category_href: format!("/categories/{}", subcategory.category_id),
        subcategory: TileView::from(&subcategory),
        products: products.iter().map(ProductCardView::from).collect(),
    })
}

/// Display a product with its add-to-cart form.
#[instrument(skip(state, page))]
pub async fn product(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<ProductId>,
) -> Result<ProductTemplate> {
    let product = state.backend().get_product(id).await?;

    Ok(ProductTemplate {
        page,
        product: ProductDetailView {
            card: ProductCardView::from(&product),
            description: product.description.clone(),
            stock: product.stock,
            subcategory_href: format!("/subcategories/{}", product.sub_category_id),
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(discount: u32) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "subCategoryId": 2,
            "name": "Lamp",
            "price": "40.00",
            "discount": discount,
            "stock": 0
        }))
        .unwrap()
    }

    #[test]
    fn test_card_without_discount() {
        let card = ProductCardView::from(&product(0));
        assert_eq!(card.price, "$40.00");
        assert!(card.compare_at_price.is_none());
        assert!(card.discount_label.is_none());
        assert!(!card.in_stock);
        assert_eq!(card.href, "/products/7");
    }

    #[test]
    fn test_card_with_discount() {
        let card = ProductCardView::from(&product(25));
        assert_eq!(card.price, "$30.00");
        assert_eq!(card.compare_at_price.as_deref(), Some("$40.00"));
        assert_eq!(card.discount_label.as_deref(), Some("-25%"));
    }
}
