//! Cache types for catalogue responses.

use std::sync::Arc;

use bazaar_core::{CategoryId, ProductId, SubCategoryId};

use super::types::{Category, Product, SubCategory};

/// Cache key for catalogue reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Category(CategoryId),
    SubCategories(Option<CategoryId>),
    SubCategory(SubCategoryId),
    Products(Option<SubCategoryId>),
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Category(Arc<Category>),
    SubCategories(Arc<Vec<SubCategory>>),
    SubCategory(Arc<SubCategory>),
    Products(Arc<Vec<Product>>),
    Product(Arc<Product>),
}
