//! REST client for user management.
//!
//! Unlike the storefront client nothing here is cached: the admin screens
//! must always show the backend's current view of the user table.

pub mod types;

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use bazaar_core::UserId;

use crate::config::BackendConfig;

pub use types::*;

/// Errors that can occur when talking to the REST backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl BackendError {
    /// Message safe to show the admin for 4xx responses.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status { status, message } if (400..500).contains(status) => Some(message),
            Self::NotFound(message) => Some(message),
            _ => None,
        }
    }

    /// Whether the backend rejected credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Client for the admin side of the REST backend.
#[derive(Clone)]
pub struct AdminBackendClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

impl AdminBackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn user_endpoint(&self, id: UserId) -> Result<Url, BackendError> {
        self.endpoint(&format!("user/admin/users/{id}"))
    }

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
            tracing::error!(status = %status, "Backend returned server error: {message}");
        }

        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// List every user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, BackendError> {
        let url = self.endpoint("user/admin/users")?;
        self.send(self.inner.client.get(url)).await
    }

    /// Get one user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: UserId) -> Result<User, BackendError> {
        let url = self.user_endpoint(id)?;
        self.send(self.inner.client.get(url)).await
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns a 4xx `Status` error if the backend rejects the payload.
    #[instrument(skip(self))]
    pub async fn create_user(&self, payload: &UserPayload) -> Result<User, BackendError> {
        let url = self.endpoint("user/admin/users")?;
        self.send(self.inner.client.post(url).json(payload)).await
    }

    /// Update a user.
    ///
    /// # Errors
    ///
    /// Returns a 4xx `Status` error if the backend rejects the payload.
    #[instrument(skip(self))]
    pub async fn update_user(
        &self,
        id: UserId,
        payload: &UserPayload,
    ) -> Result<User, BackendError> {
        let url = self.user_endpoint(id)?;
        self.send(self.inner.client.put(url).json(payload)).await
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), BackendError> {
        let url = self.user_endpoint(id)?;
        self.execute(self.inner.client.delete(url)).await.map(|_| ())
    }

    /// Check credentials and return the account.
    ///
    /// The caller decides whether the role may use the admin panel.
    ///
    /// # Errors
    ///
    /// Returns a 401 `Status` error for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let url = self.endpoint("user/login")?;
        let body = LoginRequest { email, password };
        self.send(self.inner.client.post(url).json(&body)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use axum::{
        Json, Router,
        http::StatusCode as AxumStatus,
        response::IntoResponse,
        routing::{delete, get},
    };
    use serde_json::json;

    use super::*;

    async fn client(router: Router) -> AdminBackendClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        AdminBackendClient::new(&BackendConfig {
            base_url: Url::parse(&format!("http://{addr}/api/")).unwrap(),
            api_token: Some(SecretString::from("token-123")),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_users_sends_bearer_token() {
        let router = Router::new().route(
            "/api/user/admin/users",
            get(|headers: axum::http::HeaderMap| async move {
                if headers.get("authorization").and_then(|v| v.to_str().ok())
                    == Some("Bearer token-123")
                {
                    Json(json!([
                        { "id": 1, "name": "Ada", "email": "ada@example.com", "role": "admin" }
                    ]))
                    .into_response()
                } else {
                    AxumStatus::UNAUTHORIZED.into_response()
                }
            }),
        );
        let users = client(router).await.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, bazaar_core::UserRole::Admin);
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let router = Router::new().route(
            "/api/user/admin/users/{id}",
            delete(|| async { AxumStatus::NO_CONTENT }),
        );
        client(router)
            .await
            .delete_user(UserId::new(3))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_conflict_message_is_user_facing() {
        let router = Router::new().route(
            "/api/user/admin/users",
            axum::routing::post(|| async {
                (
                    AxumStatus::CONFLICT,
                    Json(json!({ "error": "Email already in use" })),
                )
            }),
        );
        let payload = UserPayload {
            name: "Ada".to_string(),
            email: bazaar_core::Email::parse("ada@example.com").unwrap(),
            role: bazaar_core::UserRole::Customer,
            phone: None,
            password: Some("password123".to_string()),
        };
        let err = client(router)
            .await
            .create_user(&payload)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), Some("Email already in use"));
    }
}
