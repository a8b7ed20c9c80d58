//! Cart owner extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bazaar_core::GuestToken;

use crate::backend::CartOwner;
use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Who the current request's cart belongs to.
///
/// A logged-in customer owns their cart by user id. Anyone else gets a guest
/// token, created on first use and kept in the session.
pub struct Owner(pub CartOwner);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        if let Some(user) = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await?
        {
            return Ok(Self(CartOwner::User(user.id)));
        }

        if let Some(token) = session.get::<GuestToken>(session_keys::GUEST_TOKEN).await? {
            return Ok(Self(CartOwner::Guest(token)));
        }

        let token = GuestToken::generate();
        session.insert(session_keys::GUEST_TOKEN, token).await?;
        tracing::debug!(guest_token = %token, "Created guest cart token");
        Ok(Self(CartOwner::Guest(token)))
    }
}
