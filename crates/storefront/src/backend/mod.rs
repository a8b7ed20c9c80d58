//! REST backend client.
//!
//! # Architecture
//!
//! - Thin JSON wrapper over `reqwest`; the backend is the source of truth
//! - Catalogue reads (categories, subcategories, products) are cached in
//!   memory via `moka` with a 5 minute TTL
//! - Cart, order and account calls always go to the backend
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::backend::{BackendClient, CartOwner};
//!
//! let client = BackendClient::new(&config.backend)?;
//!
//! let categories = client.list_categories().await?;
//! let cart = client.add_to_cart(&CartOwner::Guest(token), product_id, 1).await?;
//! ```

mod cache;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use bazaar_core::{CartItemId, CategoryId, OrderId, ProductId, SubCategoryId, UserId};

use crate::config::BackendConfig;

use cache::{CacheKey, CacheValue};
pub use types::*;

/// Errors that can occur when talking to the REST backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the backend's error body, or the status reason.
        message: String,
    },
}

impl BackendError {
    /// Message safe to show the user for 4xx responses (validation failures,
    /// duplicate emails, bad credentials).
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status { status, message } if (400..500).contains(status) => Some(message),
            _ => None,
        }
    }

    /// Whether the backend rejected credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the storefront side of the REST backend.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Send a request and return the raw success body.
    async fn execute(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let request = match &self.inner.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<ErrorBody>(&body).map_or_else(
            |_| status.canonical_reason().unwrap_or("error").to_string(),
            |b| b.message,
        );

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(message));
        }

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned server error"
            );
        }

        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Send a request and decode the JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Send a request whose response body is ignored.
    async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        self.execute(request).await.map(|_| ())
    }

    async fn cached<T, W, U>(
        &self,
        key: CacheKey,
        url: Url,
        wrap: W,
        unwrap: U,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned + Clone,
        W: FnOnce(Arc<T>) -> CacheValue,
        U: FnOnce(CacheValue) -> Option<Arc<T>>,
    {
        if let Some(hit) = self.inner.cache.get(&key).await.and_then(unwrap) {
            debug!(?key, "Cache hit");
            return Ok(Arc::unwrap_or_clone(hit));
        }

        let value: Arc<T> = Arc::new(self.send(self.inner.client.get(url)).await?);
        self.inner.cache.insert(key, wrap(Arc::clone(&value))).await;
        Ok(Arc::unwrap_or_clone(value))
    }

    // =========================================================================
    // Catalogue Methods
    // =========================================================================

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
        let url = self.endpoint("category", &[])?;
        self.cached(CacheKey::Categories, url, CacheValue::Categories, |v| match v {
            CacheValue::Categories(c) => Some(c),
            _ => None,
        })
        .await
    }

    /// Get a category by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the category does not exist.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, BackendError> {
        let url = self.endpoint(&format!("category/{id}"), &[])?;
        self.cached(CacheKey::Category(id), url, CacheValue::Category, |v| match v {
            CacheValue::Category(c) => Some(c),
            _ => None,
        })
        .await
    }

    /// List subcategories, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn list_subcategories(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<SubCategory>, BackendError> {
        let query: Vec<(&str, String)> = category_id
            .map(|id| ("categoryId", id.to_string()))
            .into_iter()
            .collect();
        let url = self.endpoint("subcategory", &query)?;
        self.cached(
            CacheKey::SubCategories(category_id),
            url,
            CacheValue::SubCategories,
            |v| match v {
                CacheValue::SubCategories(s) => Some(s),
                _ => None,
            },
        )
        .await
    }

    /// Get a subcategory by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the subcategory does not exist.
    #[instrument(skip(self), fields(subcategory_id = %id))]
    pub async fn get_subcategory(&self, id: SubCategoryId) -> Result<SubCategory, BackendError> {
        let url = self.endpoint(&format!("subcategory/{id}"), &[])?;
        self.cached(CacheKey::SubCategory(id), url, CacheValue::SubCategory, |v| match v {
            CacheValue::SubCategory(s) => Some(s),
            _ => None,
        })
        .await
    }

    /// List products, optionally restricted to one subcategory.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        sub_category_id: Option<SubCategoryId>,
    ) -> Result<Vec<Product>, BackendError> {
        let query: Vec<(&str, String)> = sub_category_id
            .map(|id| ("subCategoryId", id.to_string()))
            .into_iter()
            .collect();
        let url = self.endpoint("product", &query)?;
        self.cached(
            CacheKey::Products(sub_category_id),
            url,
            CacheValue::Products,
            |v| match v {
                CacheValue::Products(p) => Some(p),
                _ => None,
            },
        )
        .await
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let url = self.endpoint(&format!("product/{id}"), &[])?;
        self.cached(CacheKey::Product(id), url, CacheValue::Product, |v| match v {
            CacheValue::Product(p) => Some(p),
            _ => None,
        })
        .await
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get the owner's cart. A missing cart is returned as an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, owner: &CartOwner) -> Result<Cart, BackendError> {
        let url = self.endpoint("cart", &[owner.query_pair()])?;
        match self.send(self.inner.client.get(url)).await {
            Err(BackendError::NotFound(_)) => Ok(Cart::default()),
            other => other,
        }
    }

    /// Add a product to the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the item.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let url = self.endpoint("cart/items", &[])?;
        let body = AddCartItemRequest {
            user_id: owner.user_id(),
            guest_token: owner.guest_token(),
            product_id,
            quantity,
        };
        self.send(self.inner.client.post(url).json(&body)).await
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn update_cart_item(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let url = self.endpoint(&format!("cart/items/{item_id}"), &[owner.query_pair()])?;
        let body = UpdateCartItemRequest { quantity };
        self.send(self.inner.client.put(url).json(&body)).await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove_cart_item(
        &self,
        owner: &CartOwner,
        item_id: CartItemId,
    ) -> Result<Cart, BackendError> {
        let url = self.endpoint(&format!("cart/items/{item_id}"), &[owner.query_pair()])?;
        self.send(self.inner.client.delete(url)).await
    }

    /// Empty the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, owner: &CartOwner) -> Result<(), BackendError> {
        let url = self.endpoint("cart", &[owner.query_pair()])?;
        self.send_empty(self.inner.client.delete(url)).await
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order.
    #[instrument(skip(self, payload), fields(status = %payload.status))]
    pub async fn create_order(&self, payload: &OrderPayload) -> Result<Order, BackendError> {
        let url = self.endpoint("order", &[])?;
        self.send(self.inner.client.post(url).json(payload)).await
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, BackendError> {
        let url = self.endpoint(&format!("order/{id}"), &[])?;
        self.send(self.inner.client.get(url)).await
    }

    /// Replace an order's items, totals, status and billing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, payload), fields(order_id = %id, status = %payload.status))]
    pub async fn update_order(
        &self,
        id: OrderId,
        payload: &OrderPayload,
    ) -> Result<Order, BackendError> {
        let url = self.endpoint(&format!("order/{id}"), &[])?;
        self.send(self.inner.client.put(url).json(payload)).await
    }

    /// List a user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, BackendError> {
        let url = self.endpoint("order", &[("userId", user_id.to_string())])?;
        self.send(self.inner.client.get(url)).await
    }

    // =========================================================================
    // Account Methods
    // =========================================================================

    /// Check credentials and return the account.
    ///
    /// # Errors
    ///
    /// Returns a 401 `Status` error for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let url = self.endpoint("user/login", &[])?;
        let body = LoginRequest { email, password };
        self.send(self.inner.client.post(url).json(&body)).await
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns a 4xx `Status` error if the email is taken or invalid.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, BackendError> {
        let url = self.endpoint("user/register", &[])?;
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        self.send(self.inner.client.post(url).json(&body)).await
    }
}
