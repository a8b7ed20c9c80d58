//! Layout context extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::{CurrentAdmin, Flash, session_keys};

use super::take_flash;

/// Signed-in admin and pending banner for the shared layout.
///
/// Extracting this consumes the flash message.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub admin: Option<CurrentAdmin>,
    pub flash: Option<Flash>,
}

impl PageContext {
    #[must_use]
    pub fn admin_name(&self) -> Option<&str> {
        self.admin.as_ref().map(|a| a.name.as_str())
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let admin = session
            .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten();
        let flash = take_flash(session).await;

        Ok(Self { admin, flash })
    }
}
